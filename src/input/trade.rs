//! Code for reading trade capacities.
use super::*;
use crate::area::{AreaID, AreaMap, ExoAreaID, ExoAreaMap};
use crate::id::IDCollection;
use crate::trade::{ExoLink, TradeLimits};
use serde::Deserialize;

const LINKS_FILE_NAME: &str = "links.csv";
const EXO_LINKS_FILE_NAME: &str = "exo_links.csv";

/// Import capacity into `area_id` from `partner_id`
#[derive(Debug, Deserialize, PartialEq)]
struct LinkRaw {
    area_id: String,
    partner_id: String,
    value: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct ExoLinkRaw {
    area_id: String,
    exo_area_id: String,
    max_import: f64,
    max_export: f64,
}

/// Read trade capacities between areas and with exogenous areas.
///
/// Both files are optional. Every ordered pair of distinct modelled areas needs a link capacity,
/// but this is only checked when the problem is built.
pub fn read_trade_limits(
    model_dir: &Path,
    areas: &AreaMap,
    exo_areas: &ExoAreaMap,
) -> Result<TradeLimits> {
    let file_path = model_dir.join(LINKS_FILE_NAME);
    let rows = read_csv_optional::<LinkRaw>(&file_path)?;
    let links = read_links_from_iter(rows.into_iter(), areas)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(EXO_LINKS_FILE_NAME);
    let rows = read_csv_optional::<ExoLinkRaw>(&file_path)?;
    let exo_links = read_exo_links_from_iter(rows.into_iter(), areas, exo_areas)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(TradeLimits { links, exo_links })
}

fn read_links_from_iter<I>(iter: I, areas: &AreaMap) -> Result<IndexMap<(AreaID, AreaID), f64>>
where
    I: Iterator<Item = LinkRaw>,
{
    let mut links = IndexMap::new();
    for row in iter {
        let area_id = areas.get_id_by_str(&row.area_id)?;
        let partner_id = areas.get_id_by_str(&row.partner_id)?;
        ensure!(
            area_id != partner_id,
            "Link from area {area_id} to itself is not allowed"
        );
        check_non_negative(row.value, "value")?;
        try_insert(&mut links, (area_id, partner_id), row.value)?;
    }

    Ok(links)
}

fn read_exo_links_from_iter<I>(
    iter: I,
    areas: &AreaMap,
    exo_areas: &ExoAreaMap,
) -> Result<IndexMap<(AreaID, ExoAreaID), ExoLink>>
where
    I: Iterator<Item = ExoLinkRaw>,
{
    let mut exo_links = IndexMap::new();
    for row in iter {
        let area_id = areas.get_id_by_str(&row.area_id)?;
        let exo_area_id = exo_areas.get_id_by_str(&row.exo_area_id)?;
        check_non_negative(row.max_import, "max_import")?;
        check_non_negative(row.max_export, "max_export")?;
        let link = ExoLink {
            max_import: row.max_import,
            max_export: row.max_export,
        };
        try_insert(&mut exo_links, (area_id, exo_area_id), link)?;
    }

    Ok(exo_links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::ExoArea;
    use crate::fixture::{areas, assert_error};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn link(area_id: &str, partner_id: &str, value: f64) -> LinkRaw {
        LinkRaw {
            area_id: area_id.into(),
            partner_id: partner_id.into(),
            value,
        }
    }

    #[rstest]
    fn test_read_links(areas: AreaMap) {
        let rows = [link("FR", "DE", 3.0), link("DE", "FR", 2.0)];
        let links = read_links_from_iter(rows.into_iter(), &areas).unwrap();
        let limits = TradeLimits {
            links,
            ..Default::default()
        };
        assert_approx_eq!(
            f64,
            limits.link_capacity(&"DE".into(), &"FR".into()).unwrap(),
            2.0
        );
    }

    #[rstest]
    fn test_read_links_self(areas: AreaMap) {
        assert_error!(
            read_links_from_iter([link("FR", "FR", 3.0)].into_iter(), &areas),
            "Link from area FR to itself is not allowed"
        );
    }

    #[rstest]
    fn test_read_exo_links(areas: AreaMap) {
        let exo_areas: ExoAreaMap = [(
            "CH".into(),
            ExoArea {
                id: "CH".into(),
                description: "Switzerland".into(),
            },
        )]
        .into_iter()
        .collect();
        let rows = [ExoLinkRaw {
            area_id: "FR".into(),
            exo_area_id: "CH".into(),
            max_import: 1.0,
            max_export: 2.0,
        }];
        let exo_links = read_exo_links_from_iter(rows.into_iter(), &areas, &exo_areas).unwrap();
        assert_eq!(
            exo_links[&(AreaID::new("FR"), ExoAreaID::new("CH"))],
            ExoLink {
                max_import: 1.0,
                max_export: 2.0
            }
        );
    }
}
