use crate::config::Args;
use crate::heart::Heart;
use crate::render::{
    draw_text, fit_viewport, mix, surface_to_cells, to_color, Rgb, Surface, Terminal, BG_COLOR,
    HEART_COLOR,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};

pub(crate) struct App {
    args: Args,
    seed: u64,
    heart: Heart,
    surface: Surface,
    term: Terminal,
    frame: u64,
    paused: bool,
    show_help: bool,
    should_quit: bool,
}

pub(crate) fn run(args: Args) -> Result<()> {
    let mut app = App::init(args)?;
    let result = app.main_loop();
    // Restore the terminal whether the loop ended cleanly or not.
    app.term.end()?;
    result
}

impl App {
    fn init(args: Args) -> Result<Self> {
        // All point sets and frame records are computed here, before the
        // terminal is touched; playback afterwards only reads them.
        let seed = args.seed;
        let mut rng = StdRng::seed_from_u64(seed);
        let heart = Heart::new(&args, &mut rng);

        let term = Terminal::begin()?;

        Ok(Self {
            args,
            seed,
            heart,
            surface: Surface::new(),
            term,
            frame: 0,
            paused: false,
            show_help: false,
            should_quit: false,
        })
    }

    fn main_loop(&mut self) -> Result<()> {
        let tick = Duration::from_millis(self.args.delay_ms);
        let mut last = Instant::now();
        let mut acc = Duration::ZERO;
        let mut dirty = true;

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                dirty = true;
            }

            // Sleep inside poll until the next tick is due (capped so that
            // resizes and pause state stay responsive).
            let timeout = if self.paused {
                Duration::from_millis(60)
            } else {
                tick.saturating_sub(acc).min(Duration::from_millis(60))
            };
            if event::poll(timeout)? {
                loop {
                    if let Event::Key(k) = event::read()? {
                        if k.kind == KeyEventKind::Press {
                            self.handle_key(k.code);
                            dirty = true;
                        }
                    }
                    if !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }

            let now = Instant::now();
            if self.paused {
                last = now;
            } else {
                acc += now - last;
                last = now;
                while acc >= tick {
                    acc -= tick;
                    self.frame = self.frame.wrapping_add(1);
                    dirty = true;
                }
            }

            if dirty {
                self.render_frame()?;
                dirty = false;
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('h') | KeyCode::Char('H') => self.show_help = !self.show_help,
            KeyCode::Char('r') | KeyCode::Char('R') => self.reseed(),
            _ => {}
        }
    }

    /// Remix the seed and rebuild the whole model from scratch.
    fn reseed(&mut self) {
        self.seed = self
            .seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.heart = Heart::new(&self.args, &mut rng);
        self.frame = 0;
    }

    fn render_frame(&mut self) -> Result<()> {
        self.surface.paint(self.heart.frame(self.frame));

        let bg = to_color(BG_COLOR);
        self.term.cur.clear(bg);

        let vp = fit_viewport(self.term.cols, self.term.rows);
        surface_to_cells(&self.surface, &mut self.term.cur, &vp, HEART_COLOR, BG_COLOR);

        self.draw_hud();
        if self.show_help {
            self.draw_help();
        }

        self.term.present()
    }

    fn draw_hud(&mut self) {
        let (core, edge, center) = self.heart.counts();
        let gf = self.heart.generate_frame() as u64;
        let line = format!(
            " heartbeat | frame {:>2}/{} | {} points | delay {}ms {}",
            self.frame % gf,
            gf,
            core + edge + center,
            self.args.delay_ms,
            if self.paused { "(paused)" } else { "" }
        );
        let fg = to_color(mix(
            HEART_COLOR,
            Rgb {
                r: 235,
                g: 235,
                b: 235,
            },
            0.35,
        ));
        draw_text(&mut self.term.cur, 1, 0, &line, fg, to_color(BG_COLOR));
    }

    fn draw_help(&mut self) {
        let help = [
            "Keys:",
            "  Q / Esc  quit",
            "  Space    pause",
            "  R        reseed and rebuild",
            "  H        toggle this help",
        ];
        let fg = to_color(mix(
            HEART_COLOR,
            Rgb {
                r: 235,
                g: 235,
                b: 235,
            },
            0.6,
        ));
        for (i, s) in help.iter().enumerate() {
            draw_text(&mut self.term.cur, 1, 2 + i as i32, s, fg, to_color(BG_COLOR));
        }
    }
}
