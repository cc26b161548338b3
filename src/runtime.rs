// 10 Hz control loop: keyboard (and optionally zenoh) commands -> rover motors
// Note: the rover drives a fixed distance at cruise speed, then stops and brakes on its own

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::time::interval;
use tracing::{debug, info, warn};

// local imports
use crate::config::{LOOP_HZ, RoverConfig, TOPIC_CMD_DRIVE, TOPIC_STATUS};
use crate::messages::{DriveCommand, RoverHealth, RoverStatus};
use crate::motor::{MotorBank, MotorError, RoverMotors};

/// What the operator asked for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Drive(DriveCommand),
    Quit,
}

/// Map a key press to an operator input
pub fn key_to_input(key: &KeyEvent) -> Option<Input> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Input::Quit),
        KeyCode::Char('w' | 'W') => Some(Input::Drive(DriveCommand::Forward { speed_mps: None })),
        KeyCode::Char('b' | 'B') => Some(Input::Drive(DriveCommand::Stop)),
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Some(Input::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct Motion {
    speed_mps: f32,
    started_at: Instant,
}

pub struct Runtime<'g, 'm> {
    rover: RoverMotors<'g, 'm>,
    cruise_speed: f32,
    target_distance: f32,
    motion: Option<Motion>,
    distance_m: f32,
    health: RoverHealth,
}

impl<'g, 'm> Runtime<'g, 'm> {
    pub fn new(rover: RoverMotors<'g, 'm>, config: &RoverConfig) -> Self {
        Self {
            rover,
            cruise_speed: config.cruise_speed_mps,
            target_distance: config.target_distance_m,
            motion: None,
            distance_m: 0.0,
            health: RoverHealth::Ok,
        }
    }

    pub fn rover(&self) -> &RoverMotors<'g, 'm> {
        &self.rover
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    pub fn health(&self) -> RoverHealth {
        self.health
    }

    /// Process an operator command
    pub fn on_command(&mut self, cmd: DriveCommand, now: Instant) {
        debug!("Received command: {:?}", cmd);
        match cmd {
            DriveCommand::Forward { speed_mps } => self.start_moving(speed_mps, now),
            DriveCommand::Stop => self.stop_moving(),
        }
    }

    /// Update distance travelled and stop once the target is reached
    pub fn tick(&mut self, now: Instant) {
        let Some(motion) = self.motion else {
            return;
        };
        let elapsed = now.saturating_duration_since(motion.started_at);
        self.distance_m = motion.speed_mps.abs() * elapsed.as_secs_f32();

        if self.distance_m >= self.target_distance {
            info!("Reached {} meters. Stopping...", self.target_distance);
            self.stop_moving();
        }
    }

    /// Stop and engage brakes regardless of the current state
    pub fn halt(&mut self) {
        self.motion = None;
        self.distance_m = 0.0;

        let stopped = self.rover.stop();
        let braked = self.rover.brakes_on();
        let mut ok = true;
        for result in [stopped, braked] {
            if let Err(e) = result {
                warn!("Halt incomplete: {}", e);
                self.record_failure(&e);
                ok = false;
            }
        }
        if ok {
            self.health = RoverHealth::Ok;
        }
    }

    pub fn status(&self) -> RoverStatus {
        RoverStatus {
            moving: self.is_moving(),
            speed_mps: self.motion.map_or(0.0, |motion| motion.speed_mps),
            distance_m: self.distance_m,
            brakes_engaged: self.rover.brake_engaged(),
            health: self.health,
        }
    }

    /// Halt the rover however the control loop ended, then pass its outcome on
    pub fn finish<E: std::fmt::Display>(&mut self, outcome: Result<(), E>) -> Result<(), E> {
        match &outcome {
            Ok(()) => info!("Quit requested, halting rover"),
            Err(e) => warn!("Control loop failed ({}), halting rover", e),
        }
        self.halt();
        outcome
    }

    fn start_moving(&mut self, speed_mps: Option<f32>, now: Instant) {
        if self.motion.is_some() {
            debug!("Already moving, ignoring forward command");
            return;
        }
        let speed_mps = speed_mps.unwrap_or(self.cruise_speed);

        let result = self
            .rover
            .brakes_off()
            .and_then(|()| self.rover.set_speed(speed_mps));

        match result {
            Ok(()) => {
                self.motion = Some(Motion {
                    speed_mps,
                    started_at: now,
                });
                self.distance_m = 0.0;
                self.health = RoverHealth::Ok;
                info!("Moving forward at speed: {} m/s", speed_mps);
            }
            Err(e) => {
                warn!("Could not start moving: {}", e);
                self.record_failure(&e);
                // Leave the rover braked rather than released and idle
                self.halt_after_failure();
            }
        }
    }

    fn stop_moving(&mut self) {
        if self.motion.is_none() {
            debug!("Not moving, ignoring stop command");
            return;
        }
        self.halt();
        info!("Braking and stopping the rover.");
    }

    fn halt_after_failure(&mut self) {
        let health = self.health;
        self.halt();
        if health == RoverHealth::MotorFault {
            self.health = health;
        }
    }

    fn record_failure(&mut self, error: &MotorError) {
        if matches!(error, MotorError::Transport(_) | MotorError::Fanout(_)) {
            self.health = RoverHealth::MotorFault;
        }
    }
}

/// Raw terminal mode for the lifetime of the guard
struct RawTerminal;

impl RawTerminal {
    fn enable() -> std::io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Drain pending key events without blocking
fn poll_keyboard() -> std::io::Result<Vec<Input>> {
    let mut inputs = Vec::new();
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            inputs.extend(key_to_input(&key));
        }
    }
    Ok(inputs)
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn run(config: &RoverConfig) -> Result<(), BoxError> {
    config.validate()?;

    let mut bank = MotorBank::open(config)?;
    let (mut left, mut right) = bank.groups();
    let rover = RoverMotors::new(&mut left, &mut right, config.speed_limit_mps)?;
    let mut runtime = Runtime::new(rover, config);

    let session = if config.remote {
        info!("Opening Zenoh session...");
        Some(zenoh::open(zenoh::Config::default()).await?)
    } else {
        None
    };
    let subscriber = match &session {
        Some(session) => Some(session.declare_subscriber(TOPIC_CMD_DRIVE).await?),
        None => None,
    };
    let pub_status = match &session {
        Some(session) => Some(session.declare_publisher(TOPIC_STATUS).await?),
        None => None,
    };
    if session.is_some() {
        info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
        info!("Publishing to: {}", TOPIC_STATUS);
    }

    let _terminal = RawTerminal::enable()?;
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, {} m/s cruise, {} m target",
        LOOP_HZ, config.cruise_speed_mps, config.target_distance_m
    );
    info!("Controls: W=forward, B=brake and stop, Q=quit");

    // Every way out of the loop goes through `finish`, which halts the rover
    let outcome: Result<(), BoxError> = async {
        loop {
            tick.tick().await;

            // 1. Keyboard
            for input in poll_keyboard()? {
                match input {
                    Input::Drive(cmd) => runtime.on_command(cmd, Instant::now()),
                    Input::Quit => return Ok::<(), BoxError>(()),
                }
            }

            // 2. Remote commands (non-blocking), applied in arrival order
            if let Some(subscriber) = &subscriber {
                while let Ok(Some(sample)) = subscriber.try_recv() {
                    let payload = sample.payload().to_bytes();
                    match serde_json::from_slice::<DriveCommand>(&payload) {
                        Ok(cmd) => runtime.on_command(cmd, Instant::now()),
                        Err(e) => warn!("Failed to parse command: {}", e),
                    }
                }
            }

            // 3. Distance check
            runtime.tick(Instant::now());

            // 4. Publish status
            if let Some(publisher) = &pub_status {
                let status_json = serde_json::to_string(&runtime.status())?;
                publisher.put(status_json).await?;
            }
        }
    }
    .await;

    runtime.finish(outcome)
}
