// file: src/utils/progress_bar.rs
// description: terminal progress bars that mirror task views
// reference: uses indicatif for progress bars

use crate::models::{TaskStatus, TaskView};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// One bar per submitted task, all drawn under a shared `MultiProgress`.
pub struct TaskProgressBars {
    multi: MultiProgress,
    colored: bool,
}

impl TaskProgressBars {
    pub fn new(colored: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            colored,
        }
    }

    pub fn add(&self, label: &str) -> TaskBar {
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(task_style(self.colored));
        bar.set_prefix(label.to_string());
        TaskBar { bar }
    }
}

pub struct TaskBar {
    bar: ProgressBar,
}

impl TaskBar {
    /// Copies percentage and description from the latest view.
    pub fn update(&self, view: &TaskView) {
        self.bar.set_position(u64::from(view.progress_percent));
        self.bar.set_message(describe(view));
    }

    pub fn finish(&self, view: &TaskView) {
        self.update(view);
        self.bar.finish_with_message(match view.status {
            TaskStatus::Completed => format!("done ({})", view.step),
            _ => format!("failed ({})", view.step),
        });
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

fn describe(view: &TaskView) -> String {
    match &view.agent_progress {
        Some(agents) if view.status == TaskStatus::Processing => {
            let parts: Vec<String> = agents
                .iter()
                .map(|(agent, percent)| format!("{} {}%", agent, percent))
                .collect();
            format!("{} [{}]", view.progress_description, parts.join(", "))
        }
        _ => view.progress_description.clone(),
    }
}

fn task_style(colored: bool) -> ProgressStyle {
    if colored {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .expect("Failed to create progress bar template")
            .progress_chars("█▓▒░")
    } else {
        ProgressStyle::default_bar()
            .template("{spinner} {prefix} [{bar:30}] {pos:>3}% {msg}")
            .expect("Failed to create progress bar template")
            .progress_chars("=>-")
    }
}
