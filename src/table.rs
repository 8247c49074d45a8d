use std::cmp::Ordering;

use crate::models::JobApplication;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Company,
    AppliedDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Client-side view over the job snapshot: filter text, sort, selection.
#[derive(Debug, Default)]
pub struct TableView {
    sort: Option<(SortColumn, SortDirection)>,
    filter: String,
    selected: usize,
    editing_filter: bool,
}

impl TableView {
    pub fn sort(&self) -> Option<(SortColumn, SortDirection)> {
        self.sort
    }

    /// First toggle sorts ascending, later toggles flip direction.
    pub fn toggle_sort(&mut self, column: SortColumn) {
        self.sort = match self.sort {
            Some((current, SortDirection::Asc)) if current == column => {
                Some((column, SortDirection::Desc))
            }
            _ => Some((column, SortDirection::Asc)),
        };
        self.selected = 0;
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.selected = 0;
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter.push(c);
        self.selected = 0;
    }

    pub fn pop_filter_char(&mut self) {
        self.filter.pop();
        self.selected = 0;
    }

    pub fn is_editing_filter(&self) -> bool {
        self.editing_filter
    }

    pub fn set_editing_filter(&mut self, editing: bool) {
        self.editing_filter = editing;
    }

    /// Rows to display: filtered, then stably sorted so ties keep server order.
    pub fn rows<'a>(&self, jobs: &'a [JobApplication]) -> Vec<&'a JobApplication> {
        let needle = self.filter.to_lowercase();
        let mut rows: Vec<&JobApplication> = jobs
            .iter()
            .filter(|job| matches_filter(job, &needle))
            .collect();

        if let Some((column, direction)) = self.sort {
            rows.sort_by(|a, b| compare(a, b, column, direction));
        }
        rows
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Keep the cursor inside the visible rows.
    pub fn clamp_selection(&mut self, row_count: usize) {
        if row_count == 0 {
            self.selected = 0;
        } else if self.selected >= row_count {
            self.selected = row_count - 1;
        }
    }

    pub fn next(&mut self, row_count: usize) {
        if row_count > 0 && self.selected < row_count - 1 {
            self.selected += 1;
        }
    }

    pub fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_row<'a>(&self, jobs: &'a [JobApplication]) -> Option<&'a JobApplication> {
        self.rows(jobs).get(self.selected).copied()
    }
}

fn matches_filter(job: &JobApplication, needle: &str) -> bool {
    needle.is_empty()
        || job.company.to_lowercase().contains(needle)
        || job.position.to_lowercase().contains(needle)
}

fn compare(
    a: &JobApplication,
    b: &JobApplication,
    column: SortColumn,
    direction: SortDirection,
) -> Ordering {
    match column {
        SortColumn::Company => {
            let ord = a.company.to_lowercase().cmp(&b.company.to_lowercase());
            apply_direction(ord, direction)
        }
        // Rows without a date go last in either direction.
        SortColumn::AppliedDate => match (a.applied_date, b.applied_date) {
            (Some(x), Some(y)) => apply_direction(x.cmp(&y), direction),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

fn apply_direction(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}
