//! Speech output.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use tokio::process::{Child, Command};

/// Something that can read text aloud.
pub trait Speaker: Send + Sync + 'static {
    /// Starts reading `text` aloud and returns immediately.
    ///
    /// An utterance still in progress is cancelled first. Failures are
    /// logged, never reported.
    fn speak(&self, text: &str);

    /// Stops the current utterance, if any.
    fn cancel(&self);
}

#[cfg(target_os = "macos")]
const CANDIDATES: &[&str] = &["say"];
#[cfg(not(target_os = "macos"))]
const CANDIDATES: &[&str] = &["espeak-ng", "espeak"];

/// A [`Speaker`] backed by a text-to-speech command of the system.
///
/// The text is passed as the only argument, and the command is killed
/// when the next utterance starts or when the speaker is dropped.
#[derive(Debug)]
pub struct CommandSpeaker {
    program: PathBuf,
    child: Mutex<Option<Child>>,
}

impl CommandSpeaker {
    /// Uses `program` to speak.
    #[inline]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            child: Mutex::new(None),
        }
    }

    /// Looks for a known text-to-speech command in `PATH`: `say` on
    /// macOS, `espeak-ng` or `espeak` elsewhere.
    ///
    /// Returns `None` if there is none, in which case speech should be
    /// disabled.
    pub fn detect() -> Option<Self> {
        let path = env::var_os("PATH")?;
        let program = find_program(&path, CANDIDATES)?;
        debug!("using {} for speech", program.display());
        Some(Self::new(program))
    }

    /// The command used to speak.
    #[inline]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn replace_child(&self, child: Option<Child>) {
        let mut guard =
            self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut prior) = guard.take() {
            // The child may have exited already, which is fine.
            prior.start_kill().ok();
        }
        *guard = child;
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) {
        self.cancel();
        if text.trim().is_empty() {
            return;
        }

        let spawned = Command::new(&self.program)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        match spawned {
            Ok(child) => self.replace_child(Some(child)),
            Err(err) => {
                warn!("failed to run {}: {err}", self.program.display());
            }
        }
    }

    #[inline]
    fn cancel(&self) {
        self.replace_child(None);
    }
}

fn find_program(path: &OsString, candidates: &[&str]) -> Option<PathBuf> {
    env::split_paths(path).find_map(|dir| {
        candidates
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_find_program() {
        let root = env::temp_dir()
            .join(format!("article-tutor-speech-{}", std::process::id()));
        let first = root.join("first");
        let second = root.join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(second.join("espeak"), b"").unwrap();

        let path = env::join_paths([&first, &second]).unwrap();
        assert_eq!(
            find_program(&path, &["espeak-ng", "espeak"]),
            Some(second.join("espeak"))
        );
        assert_eq!(find_program(&path, &["say"]), None);

        fs::write(first.join("espeak-ng"), b"").unwrap();
        assert_eq!(
            find_program(&path, &["espeak-ng", "espeak"]),
            Some(first.join("espeak-ng"))
        );

        fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_speak_missing_program() {
        let speaker = CommandSpeaker::new("/nonexistent/article-tutor-tts");
        assert_eq!(
            speaker.program(),
            Path::new("/nonexistent/article-tutor-tts")
        );
        // Failing to spawn is logged and otherwise ignored.
        speaker.speak("Hello there.");
        speaker.cancel();
    }
}
