pub mod tone;

use tone::{Tone, Waveform};

use log::warn;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

enum ToneCommand {
    Success,
    Error,
}

/// Audible success/error cues, played on a dedicated thread because the rodio
/// output objects are not Send. Each cue runs on its own detached sink, so
/// calls are safe to repeat and overlap; failures are logged and never reach
/// the scan path.
#[derive(Clone)]
pub struct ToneEngine {
    tx: Arc<Mutex<Option<Sender<ToneCommand>>>>,
    muted: bool,
}

impl ToneEngine {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            muted: false,
        }
    }

    /// Engine that swallows every cue; used for tests and `--mute`.
    pub fn muted() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            muted: true,
        }
    }

    /// Short high beep confirming a counted scan.
    pub fn success(&self) {
        self.send(ToneCommand::Success);
    }

    /// Low double buzz for rejected or failed scans.
    pub fn error(&self) {
        self.send(ToneCommand::Error);
    }

    fn send(&self, command: ToneCommand) {
        if self.muted {
            return;
        }

        match self.ensure_thread() {
            Ok(tx) => {
                if tx.send(command).is_err() {
                    warn!("Tone thread is gone; audio cues disabled");
                }
            }
            Err(err) => warn!("Tone engine unavailable: {err}"),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<ToneCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<ToneCommand>();

        thread::Builder::new()
            .name("tone-engine".to_string())
            .spawn(move || {
                // Created lazily on the first cue and kept for the thread's
                // lifetime; a machine without an audio device just logs.
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;

                while let Ok(cmd) = rx.recv() {
                    let cues: Vec<Box<dyn Source<Item = f32> + Send>> = match cmd {
                        ToneCommand::Success => vec![Box::new(Tone::new(
                            1200.0,
                            Waveform::Sine,
                            Duration::from_millis(100),
                        ))],
                        ToneCommand::Error => vec![
                            Box::new(Tone::new(
                                150.0,
                                Waveform::Sawtooth,
                                Duration::from_millis(150),
                            )),
                            Box::new(
                                Tone::new(100.0, Waveform::Sawtooth, Duration::from_millis(150))
                                    .delay(Duration::from_millis(200)),
                            ),
                        ],
                    };

                    if let Err(err) = play_cues(&mut output, cues) {
                        warn!("Audio cue failed: {err}");
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }
}

impl Default for ToneEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn play_cues(
    output: &mut Option<(OutputStream, OutputStreamHandle)>,
    cues: Vec<Box<dyn Source<Item = f32> + Send>>,
) -> Result<(), String> {
    if output.is_none() {
        let pair = OutputStream::try_default()
            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
        *output = Some(pair);
    }

    if let Some((_, handle)) = output.as_ref() {
        for cue in cues {
            let sink =
                Sink::try_new(handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;
            sink.append(cue);
            sink.detach();
        }
    }

    Ok(())
}
