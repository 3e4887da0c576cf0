//! Windowed session: the agent keeps learning while every step is drawn.

use crate::config::Config;
use crate::draw::{render, Canvas, Hud};
use crate::store::TableStore;
use crate::trainer::Trainer;
use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use std::time::{Duration, Instant};
use tracing::{error, info};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

/// Runs until the window is closed or Escape is pressed, then saves the table and exits
/// the process.
pub fn run(cfg: Config, mut trainer: Trainer, store: Box<dyn TableStore>) -> Result<()> {
    let (width, height) = (cfg.grid.width as u32, cfg.grid.height as u32);
    let cell = cfg.grid.cell;
    let save_every_episode = cfg.watch.save_every_episode;
    let tick = Duration::from_secs_f64(1.0 / f64::from(cfg.watch.steps_per_second));

    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();
    let window = WindowBuilder::new()
        .with_title("Snake Q-learning")
        .with_inner_size(LogicalSize::new(width, height))
        .with_resizable(false)
        .build(&event_loop)
        .context("failed to open window")?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(width, height, surface_texture).context("failed to create pixel buffer")?
    };

    let mut last_step = Instant::now();
    let mut best = 0;
    info!("interactive session started, press Esc to quit");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            {
                let agent = trainer.agent();
                let hud = Hud { episode: agent.episodes, best, epsilon: agent.epsilon };
                let mut canvas = Canvas::new(pixels.frame_mut(), width, height);
                render(&mut canvas, &trainer.game().snapshot(), cell, &hud);
            }
            if let Err(e) = pixels.render() {
                error!("render failed: {e}");
                trainer.checkpoint(store.as_ref());
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape)
                || input.close_requested()
                || input.destroyed()
            {
                info!("quit requested, saving q-table");
                trainer.checkpoint(store.as_ref());
                *control_flow = ControlFlow::Exit;
                return;
            }

            if last_step.elapsed() >= tick {
                last_step = Instant::now();
                if let Some(ep) = trainer.tick() {
                    best = best.max(ep.score);
                    info!(
                        "game {}: score {} total reward {} epsilon {:.4} ({:?})",
                        ep.episode + 1,
                        ep.score,
                        ep.total_reward,
                        ep.epsilon,
                        ep.end
                    );
                    if save_every_episode {
                        trainer.checkpoint(store.as_ref());
                    }
                }
            }

            window.request_redraw();
        }
    })
}
