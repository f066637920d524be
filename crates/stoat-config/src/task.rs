// Task table — named classification problems and their class sets

use std::collections::BTreeMap;

/// A named classification problem.
///
/// `classes: None` means "use every class found on disk"; the provider
/// infers the class set from the subdirectories of the data root in that
/// case. Tasks are immutable once defined.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub classes: Option<Vec<String>>,
}

impl Task {
    pub fn new(name: &str, classes: Option<&[&str]>) -> Self {
        Task {
            name: name.to_string(),
            classes: classes.map(|cs| cs.iter().map(|c| c.to_string()).collect()),
        }
    }

    /// Number of classes, when the task pins them explicitly.
    pub fn n_classes(&self) -> Option<usize> {
        self.classes.as_ref().map(|c| c.len())
    }
}

/// The built-in task table.
///
/// Class subsets of the Moments-in-Time action vocabulary, plus `full`
/// which takes whatever the dataset directory contains (used for UCF-101,
/// where all 101 classes are trained).
pub fn builtin_tasks() -> BTreeMap<String, Task> {
    let mut tasks = BTreeMap::new();
    let mut add = |name: &str, classes: Option<&[&str]>| {
        tasks.insert(name.to_string(), Task::new(name, classes));
    };

    add("2c_easy", Some(&["cooking", "walking"]));
    add("2c_hard", Some(&["running", "walking"]));
    add(
        "5c_hard",
        Some(&["biting", "climbing", "running", "sleeping", "walking"]),
    );
    add(
        "10c",
        Some(&[
            "barking",
            "cooking",
            "driving",
            "juggling",
            "photographing",
            "biting",
            "climbing",
            "running",
            "sleeping",
            "walking",
        ]),
    );
    add("full", None);

    tasks
}
