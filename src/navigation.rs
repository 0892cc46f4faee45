use chrono::{Datelike, Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthStep {
    Next,
    Previous,
}

/// Which month the grid shows and which day the detail panel shows. The two
/// are deliberately independent: selecting a day never moves the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    display_year: i32,
    display_month: u32,
    selected: NaiveDate,
}

impl NavigationState {
    pub fn starting_at(date: NaiveDate) -> Self {
        NavigationState {
            display_year: date.year(),
            display_month: date.month(),
            selected: date,
        }
    }

    pub fn display_year(&self) -> i32 {
        self.display_year
    }

    pub fn display_month(&self) -> u32 {
        self.display_month
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn advance_month(&mut self, step: MonthStep) {
        match step {
            MonthStep::Next if self.display_month == 12 => {
                self.display_month = 1;
                self.display_year += 1;
            }
            MonthStep::Next => self.display_month += 1,
            MonthStep::Previous if self.display_month == 1 => {
                self.display_month = 12;
                self.display_year -= 1;
            }
            MonthStep::Previous => self.display_month -= 1,
        }
    }

    pub fn jump_to_date(&mut self, date: NaiveDate) {
        self.selected = date;
    }

    pub fn show_selected_month(&mut self) {
        self.display_year = self.selected.year();
        self.display_month = self.selected.month();
    }

    /// Selects `day` of the displayed month. Returns false when that day does
    /// not exist (e.g. the 31st of April).
    pub fn select_day_in_view(&mut self, day: u32) -> bool {
        match NaiveDate::from_ymd_opt(self.display_year, self.display_month, day) {
            Some(date) => {
                self.selected = date;
                true
            }
            None => false,
        }
    }

    pub fn shift_selected(&mut self, days: i64) {
        if let Some(date) = self.selected.checked_add_signed(Duration::days(days)) {
            self.selected = date;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn wraps_year_boundaries() {
        let mut nav = NavigationState::starting_at(date(2025, 12, 15));
        nav.advance_month(MonthStep::Next);
        assert_eq!((nav.display_year(), nav.display_month()), (2026, 1));
        nav.advance_month(MonthStep::Previous);
        nav.advance_month(MonthStep::Previous);
        assert_eq!((nav.display_year(), nav.display_month()), (2025, 11));

        let mut jan = NavigationState::starting_at(date(2024, 1, 1));
        jan.advance_month(MonthStep::Previous);
        assert_eq!((jan.display_year(), jan.display_month()), (2023, 12));
    }

    #[test]
    fn twelve_forward_twelve_back_is_identity() {
        for month in 1..=12 {
            let start = NavigationState::starting_at(date(2025, month, 1));
            let mut nav = start.clone();
            for _ in 0..12 {
                nav.advance_month(MonthStep::Next);
            }
            assert_eq!((nav.display_year(), nav.display_month()), (2026, month));
            for _ in 0..12 {
                nav.advance_month(MonthStep::Previous);
            }
            assert_eq!(nav, start);
        }
    }

    #[test]
    fn selecting_another_month_keeps_grid() {
        let mut nav = NavigationState::starting_at(date(2025, 11, 10));
        nav.jump_to_date(date(2026, 3, 2));
        assert_eq!(nav.selected(), date(2026, 3, 2));
        assert_eq!((nav.display_year(), nav.display_month()), (2025, 11));

        nav.shift_selected(-2);
        assert_eq!(nav.selected(), date(2026, 2, 28));
        assert_eq!(nav.display_month(), 11);

        nav.show_selected_month();
        assert_eq!((nav.display_year(), nav.display_month()), (2026, 2));
    }

    #[test]
    fn select_day_in_view_checks_bounds() {
        let mut nav = NavigationState::starting_at(date(2025, 4, 1));
        assert!(!nav.select_day_in_view(31));
        assert_eq!(nav.selected(), date(2025, 4, 1));
        assert!(nav.select_day_in_view(30));
        assert_eq!(nav.selected(), date(2025, 4, 30));
    }
}
