use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use reliontomo::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Spinner on stderr that follows the workflow phases and echoes the launched commands.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner().with_style(Self::spinner_style());
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut pb_guard) = pb_clone.lock() else {
                warn!("Progress spinner mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    *pb_guard = ProgressBar::new_spinner().with_style(Self::spinner_style());
                    pb_guard.set_draw_target(ProgressDrawTarget::stderr());
                    pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb_guard.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    pb_guard.disable_steady_tick();
                    let phase = pb_guard.message();
                    pb_guard.finish_with_message(format!("✓ {}", phase));
                }
                Progress::ProgramStart { command } => {
                    pb_guard.println(format!("  $ {}", command));
                }
                Progress::ProgramFinish => {
                    pb_guard.println("  program finished");
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_starts_finished() {
        let handler = CliProgressHandler::new();
        assert!(handler.pb.lock().unwrap().is_finished());
    }

    #[test]
    fn phases_drive_the_spinner() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Reconstructing tomogram",
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "Reconstructing tomogram");
            assert!(!pb.is_finished());
        }

        callback(Progress::ProgramStart {
            command: "relion_tomo_reconstruct_tomogram --tn TS_01".to_string(),
        });
        callback(Progress::ProgramFinish);
        callback(Progress::PhaseFinish);
        {
            let pb = handler.pb.lock().unwrap();
            assert!(pb.is_finished());
            assert_eq!(pb.message(), "✓ Reconstructing tomogram");
        }
    }

    #[test]
    fn message_after_finish_replaces_text() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();
        callback(Progress::Message("Wrote outputs.toml".to_string()));
        assert_eq!(handler.pb.lock().unwrap().message(), "Wrote outputs.toml");
    }

    #[test]
    fn callback_can_be_shared_across_threads() {
        let handler = CliProgressHandler::new();
        let callback = Arc::new(handler.get_callback());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cb = callback.clone();
                thread::spawn(move || (**cb)(Progress::Message(format!("worker {}", i))))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(handler.pb.lock().is_ok());
    }
}
