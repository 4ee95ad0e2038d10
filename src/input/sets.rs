//! Code for reading areas, technologies and technology sets.
use super::*;
use crate::area::{Area, AreaID, AreaMap, ExoArea, ExoAreaID, ExoAreaMap};
use crate::technology::{
    GroupID, Technology, TechnologyID, TechnologyMap, TechnologySetKind, TechnologySets,
};
use serde::Deserialize;

const AREAS_FILE_NAME: &str = "areas.csv";
const EXO_AREAS_FILE_NAME: &str = "exo_areas.csv";
const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";
const TECHNOLOGY_SETS_FILE_NAME: &str = "technology_sets.csv";

/// A technology as it appears in the input file
#[derive(Debug, Deserialize, PartialEq)]
struct TechnologyRaw {
    id: TechnologyID,
    /// Defaults to the technology's ID
    group: Option<GroupID>,
}
crate::id::define_id_getter! {TechnologyRaw, TechnologyID}

/// A row of the technology sets file
#[derive(Debug, Deserialize, PartialEq)]
struct TechnologySetRaw {
    set: TechnologySetKind,
    technology_id: TechnologyID,
}

/// Read modelled areas from the specified model directory.
///
/// At least one area must be given.
pub fn read_areas(model_dir: &Path) -> Result<AreaMap> {
    let file_path = model_dir.join(AREAS_FILE_NAME);
    let areas: AreaMap = read_csv_id_file::<Area, AreaID>(&file_path)?;
    ensure!(
        !areas.is_empty(),
        "{}: at least one area must be given",
        file_path.display()
    );

    Ok(areas)
}

/// Read exogenous areas from the specified model directory.
///
/// The file is optional.
pub fn read_exo_areas(model_dir: &Path) -> Result<ExoAreaMap> {
    read_csv_id_file::<ExoArea, ExoAreaID>(&model_dir.join(EXO_AREAS_FILE_NAME))
}

/// Read technologies from the specified model directory.
pub fn read_technologies(model_dir: &Path) -> Result<TechnologyMap> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let raw = read_csv_id_file::<TechnologyRaw, TechnologyID>(&file_path)?;
    ensure!(
        !raw.is_empty(),
        "{}: at least one technology must be given",
        file_path.display()
    );

    Ok(raw
        .into_iter()
        .map(|(id, technology)| {
            let group = technology.group.unwrap_or_else(|| GroupID::new(&id.0));
            (id.clone(), Technology { id, group })
        })
        .collect())
}

/// Read the technology sets file and check the sets are consistent.
pub fn read_technology_sets(
    model_dir: &Path,
    technologies: &TechnologyMap,
) -> Result<TechnologySets> {
    let file_path = model_dir.join(TECHNOLOGY_SETS_FILE_NAME);
    let rows = read_csv::<TechnologySetRaw>(&file_path)?;
    read_technology_sets_from_iter(rows.into_iter(), technologies)
        .with_context(|| input_err_msg(&file_path))
}

fn read_technology_sets_from_iter<I>(
    iter: I,
    technologies: &TechnologyMap,
) -> Result<TechnologySets>
where
    I: Iterator<Item = TechnologySetRaw>,
{
    let memberships = iter.map(|row| (row.set, row.technology_id));
    TechnologySets::from_memberships(technologies, memberships)
}
