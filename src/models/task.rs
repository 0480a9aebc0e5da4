use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One entry of a user's task list.
///
/// Read-only from the sync core's perspective. Task ids written by older
/// clients may be numeric, so they are normalized to strings on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// Local date, `YYYY-MM-DD`.
    #[serde(default)]
    pub due_date: Option<String>,
    /// Local time of day, `HH:MM`.
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
}

impl Task {
    /// Narrow to an [`EligibleTask`] when the task belongs on the calendar.
    ///
    /// Empty time strings count as absent.
    pub fn as_eligible(&self) -> Option<EligibleTask<'_>> {
        if self.completed {
            return None;
        }
        let start_time = self.start_time.as_deref().filter(|s| !s.is_empty())?;
        let end_time = self.end_time.as_deref().filter(|s| !s.is_empty())?;
        Some(EligibleTask {
            task: self,
            start_time,
            end_time,
        })
    }
}

/// A task with a complete time window that is not yet done.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibleTask<'a> {
    pub task: &'a Task,
    pub start_time: &'a str,
    pub end_time: &'a str,
}

impl<'a> EligibleTask<'a> {
    pub fn id(&self) -> &'a str {
        &self.task.id
    }
}

/// A user's task document.
///
/// Entries are decoded one at a time. An entry that cannot be read as a
/// [`Task`] lands in `rejected` instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTaskList")]
pub struct TaskListRecord {
    pub list: Vec<Task>,
    #[serde(skip)]
    pub rejected: Vec<RejectedTask>,
}

/// A task list entry that did not decode but looks like it was meant for
/// the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedTask {
    /// The entry's id when readable, otherwise `#<index>`.
    pub task_id: String,
    pub reason: String,
}

#[derive(Deserialize)]
struct RawTaskList {
    #[serde(default)]
    list: Vec<Value>,
}

impl From<RawTaskList> for TaskListRecord {
    fn from(raw: RawTaskList) -> Self {
        let mut record = TaskListRecord::default();
        for (index, entry) in raw.list.into_iter().enumerate() {
            match Task::deserialize(&entry) {
                Ok(task) => record.list.push(task),
                Err(_) if !looks_scheduled(&entry) => {}
                Err(e) => record.rejected.push(RejectedTask {
                    task_id: raw_id(&entry).unwrap_or_else(|| format!("#{index}")),
                    reason: e.to_string(),
                }),
            }
        }
        record
    }
}

/// Open and carrying both time fields, judged on the raw entry.
fn looks_scheduled(entry: &Value) -> bool {
    let present = |key: &str| match entry.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    };
    entry.get("completed") != Some(&Value::Bool(true))
        && present("startTime")
        && present("endTime")
}

fn raw_id(entry: &Value) -> Option<String> {
    match entry.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(n) => n.to_string(),
    })
}
