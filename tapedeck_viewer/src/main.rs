//! Interactive 3D cassette player showcase. Boots wgpu/winit, loads the
//! model on a worker thread, and routes pointer input into the playback
//! controller.

mod audio;
mod cli;
mod download;
mod hotspots;
mod overlays;
mod scene;
mod screen_plane;
mod texture;
mod ui_layout;
mod viewer;

use std::{
    sync::{Arc, mpsc},
    thread,
};

use anyhow::{Context, Result};
use clap::Parser;
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use tapedeck_model::{Model, load_environment, load_model};
use tapedeck_player::Playlist;

use cli::Args;
use overlays::HudFont;
use viewer::{ViewerSetup, ViewerState};

enum ModelEvent {
    Progress(f32),
    Ready(Box<Model>),
    Failed(String),
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    let playlist = Playlist::load(&args.playlist).context("loading playlist")?;
    println!(
        "[tapedeck_viewer] playlist: {} streams from {}",
        playlist.len(),
        args.playlist.display()
    );

    if args.headless {
        let model = load_model(&args.model, &mut |_| {}).context("loading model")?;
        println!(
            "[tapedeck_viewer] model '{}': {} nodes ({})",
            model.name,
            model.nodes().len(),
            args.model.display()
        );
        match model.hotspot_nodes() {
            Some(_) => println!("[tapedeck_viewer] transport hotspots resolved"),
            None => println!(
                "[tapedeck_viewer] warning: hotspot nodes missing, transport controls disabled"
            ),
        }
        println!("Headless mode requested; viewer window bootstrap skipped.");
        return Ok(());
    }

    let environment = match args.environment.as_ref() {
        Some(path) => Some(load_environment(path).context("loading environment map")?),
        None => None,
    };
    let font = HudFont::load(&args.hud_font).context("loading HUD font")?;
    let audio = audio::create_audio();

    // Model parsing is the slow part of startup, so it runs on a worker
    // thread and streams progress into the loading panel.
    let (model_tx, model_rx) = mpsc::channel();
    let model_path = args.model.clone();
    thread::spawn(move || {
        let mut last_sent = -1.0f32;
        let result = load_model(&model_path, &mut |fraction| {
            if fraction - last_sent >= 0.01 {
                last_sent = fraction;
                let _ = model_tx.send(ModelEvent::Progress(fraction));
            }
        });
        let event = match result {
            Ok(model) => ModelEvent::Ready(Box::new(model)),
            Err(err) => ModelEvent::Failed(format!("{err:#}")),
        };
        let _ = model_tx.send(event);
    });

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Tapedeck Viewer")
            .with_inner_size(PhysicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut state = ViewerState::new(
        window,
        ViewerSetup {
            playlist,
            media_dir: args.media_dir,
            environment,
            font,
            archive_path: args.archive,
            download_dir: args.download_dir,
            audio,
        },
    )
    .block_on()?;

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::CursorMoved { position, .. } => {
                            state.pointer_moved(position.x as f32, position.y as f32)
                        }
                        WindowEvent::MouseInput {
                            state: button_state,
                            button: MouseButton::Left,
                            ..
                        } => state.pointer_button(button_state == ElementState::Pressed),
                        WindowEvent::MouseWheel { delta, .. } => {
                            let amount = match delta {
                                MouseScrollDelta::LineDelta(_, y) => y,
                                MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
                            };
                            state.scroll(amount);
                        }
                        WindowEvent::Resized(new_size) => state.resize(new_size),
                        WindowEvent::RedrawRequested => {
                            while let Ok(event) = model_rx.try_recv() {
                                match event {
                                    ModelEvent::Progress(fraction) => {
                                        state.set_load_progress(fraction)
                                    }
                                    ModelEvent::Ready(model) => state.install_model(*model),
                                    ModelEvent::Failed(message) => {
                                        log::error!("model load failed: {message}");
                                        state.model_load_failed();
                                    }
                                }
                            }
                            state.update();
                            match state.render() {
                                Ok(()) => {}
                                Err(SurfaceError::Lost) => state.resize(state.size()),
                                Err(SurfaceError::OutOfMemory) => target.exit(),
                                Err(err) => {
                                    eprintln!("[tapedeck_viewer] render error: {err:?}")
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => state.window().request_redraw(),
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}
