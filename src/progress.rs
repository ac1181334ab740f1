//! Console narration: prefixed messages and, when someone is watching, progress bars.
use std::borrow::Cow;
use std::fmt::Display;

use console::Style;
use indicatif::MultiProgress;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MsgType {
    Info,
    Error,
}

impl Display for MsgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MsgType::Info => write!(f, "INFO"),
            MsgType::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug)]
pub struct ProgressUI {
    quiet:          bool,
    multi_progress: Option<MultiProgress>,
}

impl ProgressUI {
    pub fn new(quiet: bool) -> Self {
        let user_attended = !quiet && console::user_attended();
        Self {
            quiet,
            multi_progress: user_attended.then(MultiProgress::new),
        }
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn user_attended(&self) -> bool {
        self.multi_progress.is_some()
    }

    pub fn message_style(&self, msg_type: MsgType) -> Style {
        match msg_type {
            MsgType::Info => Style::new(),
            MsgType::Error => Style::new().red().for_stderr(),
        }
    }

    fn _println(&self, msg_type: MsgType, msg: String) {
        if self.quiet {
            return;
        }

        let prefix = self.message_style(msg_type).apply_to(format!("[{msg_type}]"));
        if matches!(msg_type, MsgType::Info) {
            println!("{prefix} {msg}");
        }
        else {
            eprintln!("{prefix} {msg}");
        }
    }

    pub fn print_message<S: ToString>(&self, msg_type: MsgType, msg: S) {
        let msg = msg.to_string();
        if let Some(mp) = self.multi_progress.as_ref() {
            mp.suspend(|| {
                self._println(msg_type, msg);
            })
        }
        else {
            self._println(msg_type, msg);
        }
    }

    pub fn report_error<S: ToString>(&self, msg: S) {
        self.print_message(MsgType::Error, msg);
    }

    pub fn report_info<S: ToString>(&self, msg: S) {
        self.print_message(MsgType::Info, msg);
    }

    /// A spinner counting rows of one source. `None` when nobody is watching.
    pub fn acquire_progress<S: Into<Cow<'static, str>>>(&self, prefix: S) -> Option<ProgressBar> {
        let mp = self.multi_progress.as_ref()?;
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {prefix}: [{elapsed_precise}] {pos:>6} rows {per_sec:>12} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        Some(mp.add(ProgressBar::new_spinner().with_style(style).with_prefix(prefix)))
    }
}

pub trait MaybeProgress {
    fn maybe_inc(&self, n: u64);
    fn maybe_finish_with_message(&self, msg: impl Into<Cow<'static, str>>);
    fn maybe_abandon_with_message(&self, msg: impl Into<Cow<'static, str>>);
}

impl MaybeProgress for Option<ProgressBar> {
    fn maybe_inc(&self, n: u64) {
        if let Some(pb) = self {
            pb.inc(n);
        }
    }

    fn maybe_finish_with_message(&self, msg: impl Into<Cow<'static, str>>) {
        if let Some(pb) = self {
            pb.finish_with_message(msg);
        }
    }

    fn maybe_abandon_with_message(&self, msg: impl Into<Cow<'static, str>>) {
        if let Some(pb) = self {
            pb.abandon_with_message(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_ui_has_no_bars() {
        let ui = ProgressUI::new(true);
        assert!(ui.quiet());
        assert!(!ui.user_attended());
        let pb = ui.acquire_progress("customers");
        assert!(pb.is_none());
        // No-ops on a missing bar.
        pb.maybe_inc(1);
        pb.maybe_finish_with_message("done");
    }
}
