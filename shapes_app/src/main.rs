//! Shapes demo application
//!
//! Draws an animated mix of rectangles, ellipses, and polygons to exercise
//! every draw path: static meshes with per-draw transforms, and per-frame
//! triangulation feeding the pooled dynamic models. Escape closes the
//! window.

use std::path::Path;
use std::time::Instant;

use vk2d::config::RendererConfig;
use vk2d::render::{Renderer, Window};

const CONFIG_PATH: &str = "shapes_app/config.toml";

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("fatal: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = if Path::new(CONFIG_PATH).exists() {
        RendererConfig::from_file(CONFIG_PATH)?
    } else {
        RendererConfig::default()
    };

    let mut window = Window::new(
        &config.window.title,
        config.window.width,
        config.window.height,
    )?;
    let mut renderer = Renderer::new(&mut window, &config)?;

    let start = Instant::now();
    // Concave arrow outline in unit model space, placed per frame through
    // the draw call's transform.
    let arrow = [
        [-0.5_f32, -0.17],
        [0.0, -0.17],
        [0.0, -0.5],
        [0.5, 0.0],
        [0.0, 0.5],
        [0.0, 0.17],
        [-0.5, 0.17],
    ];

    while !window.should_close() {
        for event in window.poll_events() {
            if let glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) = event {
                window.set_should_close(true);
            }
        }

        if !renderer.begin_frame(&mut window)? {
            // Swapchain was rebuilt; draw next iteration.
            continue;
        }

        let t = start.elapsed().as_secs_f32();

        renderer.draw_rectangle(200.0, 150.0, 180.0, 120.0, t * 0.8, [0.9, 0.3, 0.2, 1.0])?;
        renderer.draw_rectangle(420.0, 150.0, 90.0, 90.0, -t, [0.2, 0.4, 0.9, 0.8])?;

        renderer.draw_ellipse(200.0, 400.0, 160.0, 100.0, t * 0.5, [0.2, 0.8, 0.3, 1.0])?;
        renderer.draw_ellipse(
            420.0,
            400.0,
            80.0 + 30.0 * t.sin(),
            80.0 + 30.0 * t.sin(),
            0.0,
            [0.9, 0.8, 0.2, 0.9],
        )?;

        renderer.draw_polygon(
            &arrow,
            560.0 + 20.0 * (t * 1.3).cos(),
            240.0,
            120.0,
            90.0,
            t * 0.7,
            [0.8, 0.4, 0.9, 1.0],
        )?;

        renderer.end_frame(&mut window)?;
    }

    renderer.wait_idle()?;
    Ok(())
}
