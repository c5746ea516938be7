use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// How long an operation is expected to take, which picks the spinner look
#[derive(Debug, Clone, Copy)]
pub enum ProgressType {
    /// Store queries and single API calls
    Fast,
    /// Inference round-trips, which can run for minutes
    Slow,
}

impl ProgressType {
    fn tick_chars(self) -> &'static str {
        match self {
            ProgressType::Fast => "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏",
            ProgressType::Slow => "⠋⠙⠚⠒⠂⠂⠒⠲⠴⠦⠖⠒⠐⠐⠒⠓⠋",
        }
    }

    fn tick_interval(self) -> Duration {
        match self {
            ProgressType::Fast => Duration::from_millis(80),
            ProgressType::Slow => Duration::from_millis(150),
        }
    }

    fn template(self) -> &'static str {
        match self {
            ProgressType::Fast => "{spinner:.cyan} {msg}",
            ProgressType::Slow => "{spinner:.yellow} {msg} {elapsed:.dim}",
        }
    }

    pub fn spinner(self, message: &str) -> Spinner {
        let bar = ProgressBar::new_spinner();
        // templates are static; a parse failure just keeps the default style
        if let Ok(progress_style) = ProgressStyle::default_spinner()
            .tick_chars(self.tick_chars())
            .template(self.template())
        {
            bar.set_style(progress_style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(self.tick_interval());
        Spinner { bar }
    }
}

/// Spinner drawn on stderr so stdout stays machine-readable
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn finish_success(&self, message: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✓").green(), message));
    }

    pub fn finish_error(&self, message: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✗").red(), style(message).red()));
    }
}
