mod schedule;

pub use schedule::next_contribution_date;
