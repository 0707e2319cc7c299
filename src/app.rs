//! App: terminal init, main loop, tick scheduling, key handling and signal dispatch.

use crate::GameConfig;
use crate::board::{Phase, Signal, Simulation};
use crate::input::{Action, key_to_action};
use crate::shape::RandomSource;
use crate::sound::{self, Music};
use crate::theme::Theme;
use crate::ui::{self, Flash};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::info;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Upper bound on one poll; keeps the flash animation smooth.
const FRAME: Duration = Duration::from_millis(16);

pub struct App {
    config: GameConfig,
    theme: Theme,
    sim: Simulation,
    /// `None` once stopped at game over; reopened on restart.
    music: Option<Box<dyn Music>>,
    flash: Flash,
    last_tick: Instant,
    /// Something changed since the last draw.
    dirty: bool,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let source = match config.seed {
            Some(seed) => {
                info!("piece seed {seed}");
                RandomSource::seeded(seed)
            }
            None => RandomSource::from_os_rng(),
        };
        let music = Some(sound::open(config.mute));
        let mut app = Self {
            config,
            theme,
            sim: Simulation::new(source),
            music,
            flash: Flash::default(),
            last_tick: Instant::now(),
            dirty: true,
        };
        app.sim.start();
        app.dispatch_signals();
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        self.stop_music();
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            if self.dirty || self.flash.is_active() {
                let now = Instant::now();
                terminal.draw(|f| ui::draw(f, &self.sim, &self.theme, &mut self.flash, now))?;
                self.dirty = false;
            }

            let timeout = if self.ticking() {
                self.config
                    .tick
                    .saturating_sub(self.last_tick.elapsed())
                    .min(FRAME)
            } else {
                FRAME
            };

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if self.handle_action(key_to_action(key)) {
                                info!("quit with score {}", self.sim.score());
                                return Ok(());
                            }
                        }
                        Event::Resize(..) => self.dirty = true,
                        _ => {}
                    }
                }
            }

            if self.ticking() && self.last_tick.elapsed() >= self.config.tick {
                self.last_tick = Instant::now();
                self.sim.tick();
            }
            self.dispatch_signals();
        }
    }

    fn stop_music(&mut self) {
        if let Some(mut music) = self.music.take() {
            music.stop();
        }
    }

    fn with_music(&mut self, f: impl FnOnce(&mut dyn Music)) {
        if let Some(music) = self.music.as_deref_mut() {
            f(music);
        }
    }

    /// The scheduler only runs while a game is in progress and not paused.
    fn ticking(&self) -> bool {
        self.sim.phase() == Phase::Running && !self.sim.is_paused()
    }

    /// Apply one action. Returns true when the app should exit.
    fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::Pause => self.sim.toggle_pause(),
            _ if self.sim.is_paused() => {}
            Action::Restart => {
                if self.sim.phase() == Phase::GameOver {
                    self.sim.start();
                }
            }
            _ if action.is_piece_command() && self.sim.piece().kind().is_empty() => {}
            Action::MoveLeft => {
                self.sim.move_left();
            }
            Action::MoveRight => {
                self.sim.move_right();
            }
            Action::RotateLeft => {
                self.sim.rotate_left();
            }
            Action::RotateRight => {
                self.sim.rotate_right();
            }
            Action::SoftDrop => self.sim.one_line_down(),
            Action::HardDrop => self.sim.drop_down(),
            Action::None => {}
        }
        self.dispatch_signals();
        false
    }

    /// React to everything the simulation reported since the last call.
    fn dispatch_signals(&mut self) {
        for signal in self.sim.drain_signals() {
            match signal {
                Signal::Started => {
                    self.last_tick = Instant::now();
                    self.flash = Flash::default();
                    let mute = self.config.mute;
                    self.music
                        .get_or_insert_with(|| sound::open(mute))
                        .play();
                    self.dirty = true;
                }
                Signal::Resumed => {
                    self.last_tick = Instant::now();
                    self.with_music(|m| m.play());
                }
                Signal::Paused => self.with_music(|m| m.pause()),
                Signal::LinesCleared(n) => {
                    info!("cleared {n} line(s), score {}", self.sim.score());
                    if !self.config.no_animation {
                        self.flash.trigger();
                    }
                    self.dirty = true;
                }
                Signal::GameOver { score } => {
                    info!("game over, final score {score}");
                    self.stop_music();
                    self.dirty = true;
                }
                Signal::Redraw => self.dirty = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn app() -> App {
        let config = GameConfig {
            tick: Duration::from_millis(300),
            seed: Some(7),
            mute: true,
            no_animation: true,
        };
        App::new(config, Theme::classic()).unwrap()
    }

    fn top_out(app: &mut App) {
        while app.sim.phase() != Phase::GameOver {
            app.handle_action(Action::HardDrop);
            app.sim.tick();
            app.dispatch_signals();
        }
    }

    #[test]
    fn test_new_app_is_running() {
        let app = app();
        assert_eq!(app.sim.phase(), Phase::Running);
        assert!(app.ticking());
        assert!(!app.sim.piece().kind().is_empty());
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert!(app.handle_action(Action::Quit));
        app.handle_action(Action::Pause);
        assert!(app.handle_action(Action::Quit));
    }

    #[test]
    fn test_pause_stops_ticks_and_blocks_moves() {
        let mut app = app();
        app.handle_action(Action::Pause);
        assert!(app.sim.is_paused());
        assert!(!app.ticking());

        let before = app.sim.position();
        app.handle_action(Action::MoveLeft);
        app.handle_action(Action::RotateRight);
        app.handle_action(Action::HardDrop);
        assert_eq!(app.sim.position(), before);

        app.handle_action(Action::Pause);
        assert!(!app.sim.is_paused());
        assert!(app.ticking());
    }

    #[test]
    fn test_moves_reach_the_simulation() {
        let mut app = app();
        let (x, y) = app.sim.position();
        app.handle_action(Action::MoveLeft);
        assert_eq!(app.sim.position(), (x - 1, y));
        app.handle_action(Action::SoftDrop);
        assert_eq!(app.sim.position(), (x - 1, y - 1));
    }

    #[test]
    fn test_restart_only_after_game_over() {
        let mut app = app();
        app.handle_action(Action::MoveLeft);
        let before = app.sim.position();
        app.handle_action(Action::Restart);
        assert_eq!(app.sim.position(), before);

        top_out(&mut app);
        assert!(!app.ticking());
        app.handle_action(Action::Restart);
        assert_eq!(app.sim.phase(), Phase::Running);
        assert_eq!(app.sim.score(), 0);
        assert!(app.sim.grid().cells().all(|(_, _, k)| k.is_empty()));
    }

    #[test]
    fn test_piece_commands_ignored_after_game_over() {
        let mut app = app();
        top_out(&mut app);
        let grid = app.sim.grid().clone();
        app.handle_action(Action::HardDrop);
        app.handle_action(Action::MoveRight);
        assert_eq!(app.sim.grid(), &grid);
        assert_eq!(app.sim.phase(), Phase::GameOver);
    }

    /// Records every call so the music lifecycle can be checked.
    struct Recorder(Rc<RefCell<Vec<&'static str>>>);

    impl Music for Recorder {
        fn play(&mut self) {
            self.0.borrow_mut().push("play");
        }

        fn pause(&mut self) {
            self.0.borrow_mut().push("pause");
        }

        fn stop(&mut self) {
            self.0.borrow_mut().push("stop");
        }
    }

    #[test]
    fn test_music_follows_game_lifecycle() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut app = app();
        app.music = Some(Box::new(Recorder(Rc::clone(&calls))));

        app.sim.start();
        app.dispatch_signals();
        app.handle_action(Action::Pause);
        app.handle_action(Action::Pause);
        top_out(&mut app);

        assert_eq!(*calls.borrow(), ["play", "pause", "play", "stop"]);
        assert!(app.music.is_none());
    }

    #[test]
    fn test_restart_reopens_stopped_music() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut app = app();
        app.music = Some(Box::new(Recorder(Rc::clone(&calls))));
        top_out(&mut app);
        assert!(app.music.is_none());

        app.handle_action(Action::Restart);
        assert!(app.music.is_some());
        // The stopped player is never touched again.
        assert_eq!(*calls.borrow(), ["stop"]);

        app.stop_music();
        assert!(app.music.is_none());
    }

    #[test]
    fn test_signals_mark_dirty() {
        let mut app = app();
        app.dirty = false;
        app.handle_action(Action::MoveRight);
        assert!(app.dirty);
    }
}
