pub mod search_dates;
