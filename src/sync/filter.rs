use crate::models::{EligibleTask, Task};

/// Tasks that belong on the calendar, in list order.
pub fn eligible(tasks: &[Task]) -> Vec<EligibleTask<'_>> {
    tasks.iter().filter_map(Task::as_eligible).collect()
}
