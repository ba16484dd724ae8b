// Test doubles shared by the integration tests: a scripted microphone and a
// recording transcription engine, both implementing the production seams.

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voicegate::audio::{wav, AudioInput, InputFactory};
use voicegate::transcribe::{EngineFactory, SpeechToText};

/// 100 ms of 16 kHz mono audio.
pub const FRAME_SAMPLES: usize = 1600;

/// Frame loud enough to clear any reasonable threshold (RMS ~0.49).
pub fn speech_frame() -> Vec<i16> {
    (0..FRAME_SAMPLES)
        .map(|i| if i % 2 == 0 { 16000 } else { -16000 })
        .collect()
}

pub fn silence_frame() -> Vec<i16> {
    vec![0; FRAME_SAMPLES]
}

/// One scripted microphone read.
#[derive(Clone)]
pub enum Read {
    Frame(Vec<i16>),
    Fail(&'static str),
    /// Block inside the read for the given duration, ignoring cancellation,
    /// then yield an empty frame. Simulates a wedged driver.
    Hang(Duration),
}

/// Microphone double that replays a fixed script. Once the script is
/// exhausted it fires the optional callback (used to cancel the session)
/// and then yields empty frames.
pub struct ScriptedInput {
    reads: VecDeque<Read>,
    on_exhausted: Option<Box<dyn FnMut() + Send>>,
    open_handles: Option<Arc<AtomicUsize>>,
}

impl ScriptedInput {
    pub fn new(reads: Vec<Read>) -> Self {
        Self {
            reads: reads.into(),
            on_exhausted: None,
            open_handles: None,
        }
    }

    pub fn on_exhausted(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_exhausted = Some(Box::new(callback));
        self
    }
}

impl AudioInput for ScriptedInput {
    fn read_frame(&mut self, _duration: Duration) -> Result<Vec<i16>> {
        match self.reads.pop_front() {
            Some(Read::Frame(frame)) => Ok(frame),
            Some(Read::Fail(msg)) => bail!(msg),
            Some(Read::Hang(duration)) => {
                std::thread::sleep(duration);
                Ok(Vec::new())
            }
            None => {
                if let Some(callback) = self.on_exhausted.as_mut() {
                    callback();
                }
                // Keep the loop idle-spinning gently until it is stopped
                std::thread::sleep(Duration::from_millis(1));
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

impl Drop for ScriptedInput {
    fn drop(&mut self) {
        if let Some(handles) = &self.open_handles {
            handles.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Factory handing out scripted inputs and counting device handles, so tests
/// can prove every acquired device is released.
pub struct ScriptedInputFactory {
    script: Vec<Read>,
    fail_open: bool,
    opens: Arc<AtomicUsize>,
    open_handles: Arc<AtomicUsize>,
}

impl ScriptedInputFactory {
    pub fn new(script: Vec<Read>) -> Self {
        Self {
            script,
            fail_open: false,
            opens: Arc::new(AtomicUsize::new(0)),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        let mut factory = Self::new(Vec::new());
        factory.fail_open = true;
        factory
    }

    /// Total number of successful opens.
    pub fn opens(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opens)
    }

    /// Devices currently held open.
    pub fn open_handles(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.open_handles)
    }
}

impl InputFactory for ScriptedInputFactory {
    fn open(&self) -> Result<Box<dyn AudioInput>> {
        if self.fail_open {
            bail!("scripted device refused to open");
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        let mut input = ScriptedInput::new(self.script.clone());
        input.open_handles = Some(Arc::clone(&self.open_handles));
        Ok(Box::new(input))
    }
}

/// What the test engine should answer per segment.
#[derive(Clone, Copy)]
pub enum EngineBehavior {
    /// Echo the decoded sample count
    EchoLength,
    /// Return whitespace (treated as nothing usable)
    Empty,
    /// Fail the call
    Fail,
}

/// Engine double recording the decoded sample count of every segment it is
/// handed.
pub struct TestEngine {
    behavior: EngineBehavior,
    segments: Mutex<Vec<usize>>,
}

impl TestEngine {
    pub fn new(behavior: EngineBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            segments: Mutex::new(Vec::new()),
        })
    }

    /// Sample counts of every transcribed segment, in order.
    pub fn segments(&self) -> Vec<usize> {
        self.segments.lock().unwrap().clone()
    }
}

impl SpeechToText for TestEngine {
    fn transcribe(&self, wav_bytes: &[u8]) -> Result<String> {
        let samples = wav::decode_to_f32(wav_bytes)?;
        self.segments.lock().unwrap().push(samples.len());
        match self.behavior {
            EngineBehavior::EchoLength => Ok(format!("segment of {} samples", samples.len())),
            EngineBehavior::Empty => Ok("   ".to_string()),
            EngineBehavior::Fail => bail!("engine exploded"),
        }
    }

    fn name(&self) -> &str {
        "test"
    }
}

/// Factory counting loads, to prove the engine singleton is built once.
pub struct TestEngineFactory {
    engine: Arc<TestEngine>,
    loads: Arc<AtomicUsize>,
}

impl TestEngineFactory {
    pub fn new(engine: Arc<TestEngine>) -> Self {
        Self {
            engine,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn loads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

impl EngineFactory for TestEngineFactory {
    fn load(&self) -> Result<Arc<dyn SpeechToText>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.engine) as Arc<dyn SpeechToText>)
    }
}

/// Poll until `condition` holds, failing the test after a few seconds.
pub async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
