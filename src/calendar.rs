//! The calendar of hours modelled, along with their mapping onto months and weeks.
//!
//! Hours are stored internally as indices `0..H`, where `H` is the number of hours, and time is
//! circular: the hour after the last hour is the first hour.
use anyhow::{Result, anyhow, ensure};
use indexmap::{IndexMap, IndexSet};
use std::ops::Range;

/// A month label, as given in the input data
pub type Month = u32;

/// A week label, as given in the input data
pub type Week = u32;

/// The hours covered by the model, with each hour's month and week
#[derive(Debug, PartialEq)]
pub struct Calendar {
    /// The label of the first hour. Hour labels are contiguous.
    first_hour: u32,
    /// The month for each hour index
    month_of_hour: Vec<Month>,
    /// The week for each hour index
    week_of_hour: Vec<Week>,
    /// Hour indices in each month, in order of first appearance
    hours_by_month: IndexMap<Month, Vec<usize>>,
    /// All weeks, in order of first appearance
    weeks: IndexSet<Week>,
}

impl Calendar {
    /// Create a new [`Calendar`] from (hour, month, week) triples.
    ///
    /// Hour labels must form a contiguous ascending sequence.
    pub fn new<I>(hours: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, Month, Week)>,
    {
        let mut first_hour = None;
        let mut month_of_hour = Vec::new();
        let mut week_of_hour = Vec::new();
        let mut hours_by_month: IndexMap<Month, Vec<usize>> = IndexMap::new();
        let mut weeks = IndexSet::new();
        for (label, month, week) in hours {
            let first = *first_hour.get_or_insert(label);
            let index = month_of_hour.len();
            ensure!(
                label.checked_sub(first) == Some(u32::try_from(index)?),
                "Hours must be contiguous and in ascending order (found hour {label} at \
                position {index})"
            );

            month_of_hour.push(month);
            week_of_hour.push(week);
            hours_by_month.entry(month).or_default().push(index);
            weeks.insert(week);
        }

        ensure!(!month_of_hour.is_empty(), "No hours given");

        Ok(Self {
            first_hour: first_hour.unwrap_or_default(),
            month_of_hour,
            week_of_hour,
            hours_by_month,
            weeks,
        })
    }

    /// The number of hours modelled
    pub fn num_hours(&self) -> usize {
        self.month_of_hour.len()
    }

    /// Iterate over hour indices
    pub fn iter_hours(&self) -> Range<usize> {
        0..self.num_hours()
    }

    /// The label for the given hour index, as used in input and output files
    pub fn hour_label(&self, hour: usize) -> u32 {
        // Labels were checked to fit in a u32 on construction
        self.first_hour + u32::try_from(hour).expect("Hour index out of range")
    }

    /// Get the hour index for the given hour label
    pub fn hour_index(&self, label: u32) -> Result<usize> {
        let index = label
            .checked_sub(self.first_hour)
            .and_then(|offset| usize::try_from(offset).ok())
            .filter(|index| *index < self.num_hours());
        index.ok_or_else(|| anyhow!("Unknown hour {label}"))
    }

    /// The hour following `hour`, wrapping from the last hour to the first
    pub fn next_hour(&self, hour: usize) -> usize {
        (hour + 1) % self.num_hours()
    }

    /// The `duration` hours strictly preceding `hour`, in chronological order.
    ///
    /// The window wraps around the start of the year, so it always contains exactly `duration`
    /// distinct hours.
    pub fn lookback_window(&self, hour: usize, duration: usize) -> impl Iterator<Item = usize> {
        let num_hours = self.num_hours();
        assert!(
            duration < num_hours,
            "Duration of {duration} hours must be less than the number of hours ({num_hours})"
        );

        (0..duration).map(move |i| (hour + num_hours - duration + i) % num_hours)
    }

    /// Check that a duration can be used with [`Calendar::lookback_window`]
    pub fn check_duration(&self, duration: usize) -> Result<()> {
        ensure!(
            duration < self.num_hours(),
            "Duration of {duration} hours must be less than the number of hours ({})",
            self.num_hours()
        );

        Ok(())
    }

    /// The month to which the hour belongs
    pub fn month_of(&self, hour: usize) -> Month {
        self.month_of_hour[hour]
    }

    /// The week to which the hour belongs
    pub fn week_of(&self, hour: usize) -> Week {
        self.week_of_hour[hour]
    }

    /// Iterate over months along with the hours they contain
    pub fn iter_months(&self) -> impl Iterator<Item = (Month, &[usize])> {
        self.hours_by_month
            .iter()
            .map(|(month, hours)| (*month, hours.as_slice()))
    }

    /// The number of hours in the given month
    pub fn hours_in_month(&self, month: Month) -> usize {
        self.hours_by_month.get(&month).map_or(0, Vec::len)
    }

    /// Whether the month appears in the calendar
    pub fn contains_month(&self, month: Month) -> bool {
        self.hours_by_month.contains_key(&month)
    }

    /// Whether the week appears in the calendar
    pub fn contains_week(&self, week: Week) -> bool {
        self.weeks.contains(&week)
    }

    /// Iterate over all months
    pub fn iter_month_labels(&self) -> impl Iterator<Item = Month> + '_ {
        self.hours_by_month.keys().copied()
    }

    /// Iterate over all weeks
    pub fn iter_weeks(&self) -> impl Iterator<Item = Week> + '_ {
        self.weeks.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, calendar};
    use itertools::Itertools;
    use rstest::rstest;

    /// A calendar of `num_hours` hours, all in month 1 and week 1
    fn flat_calendar(num_hours: u32) -> Calendar {
        Calendar::new((0..num_hours).map(|hour| (hour, 1, 1))).unwrap()
    }

    #[rstest]
    fn test_calendar_new(calendar: Calendar) {
        assert_eq!(calendar.num_hours(), 6);
        assert_eq!(calendar.month_of(0), 1);
        assert_eq!(calendar.month_of(5), 2);
        assert_eq!(calendar.week_of(3), 2);
        assert_eq!(calendar.hours_in_month(1), 3);
        assert_eq!(
            calendar.iter_months().collect_vec(),
            [(1, [0, 1, 2].as_slice()), (2, [3, 4, 5].as_slice())]
        );
        assert_eq!(calendar.iter_weeks().collect_vec(), [1, 2]);
    }

    #[test]
    fn test_calendar_new_offset_labels() {
        let calendar = Calendar::new([(1, 1, 1), (2, 1, 1), (3, 1, 1)]).unwrap();
        assert_eq!(calendar.hour_label(0), 1);
        assert_eq!(calendar.hour_index(3).unwrap(), 2);
        assert!(calendar.hour_index(0).is_err());
        assert!(calendar.hour_index(4).is_err());
    }

    #[test]
    fn test_calendar_new_gap() {
        assert_error!(
            Calendar::new([(0, 1, 1), (2, 1, 1)]),
            "Hours must be contiguous and in ascending order (found hour 2 at position 1)"
        );
    }

    #[test]
    fn test_calendar_new_empty() {
        assert_error!(Calendar::new([]), "No hours given");
    }

    #[rstest]
    #[case(0, 1)]
    #[case(4, 5)]
    #[case(5, 0)]
    fn test_next_hour(calendar: Calendar, #[case] hour: usize, #[case] expected: usize) {
        assert_eq!(calendar.next_hour(hour), expected);
    }

    #[rstest]
    #[case(5, 2, &[3, 4])]
    #[case(2, 2, &[0, 1])]
    #[case(1, 3, &[4, 5, 0])]
    #[case(0, 3, &[3, 4, 5])]
    #[case(3, 0, &[])]
    #[case(0, 5, &[1, 2, 3, 4, 5])]
    fn test_lookback_window(
        calendar: Calendar,
        #[case] hour: usize,
        #[case] duration: usize,
        #[case] expected: &[usize],
    ) {
        assert_eq!(calendar.lookback_window(hour, duration).collect_vec(), expected);
    }

    #[test]
    fn test_lookback_window_always_full() {
        let calendar = flat_calendar(24);
        for duration in 0..24 {
            for hour in calendar.iter_hours() {
                let window = calendar.lookback_window(hour, duration).collect_vec();
                assert_eq!(window.len(), duration);
                assert!(window.iter().all_unique());
                assert!(!window.contains(&hour) || duration == 0);

                // The window ends immediately before `hour`
                if let Some(last) = window.last() {
                    assert_eq!(calendar.next_hour(*last), hour);
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "must be less than the number of hours")]
    fn test_lookback_window_too_long() {
        let calendar = flat_calendar(3);
        let _ = calendar.lookback_window(0, 3).count();
    }

    #[rstest]
    fn test_check_duration(calendar: Calendar) {
        assert!(calendar.check_duration(5).is_ok());
        assert_error!(
            calendar.check_duration(6),
            "Duration of 6 hours must be less than the number of hours (6)"
        );
    }
}
