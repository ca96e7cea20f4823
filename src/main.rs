mod app;
mod config;
mod data;
mod error;
mod processing;
mod state;
mod ui;
#[cfg(test)]
mod fixtures;

use app::CountyScopeApp;
use clap::Parser;
use config::{Args, DashboardConfig};
use eframe::egui;
use eframe::egui_wgpu;

fn main() -> eframe::Result<()> {
    let config = DashboardConfig::from(Args::parse());

    // Initialize logging
    tracing_subscriber::fmt::init();
    tracing::info!("Starting with data {:?}, analysis {}", config.data, config.analysis);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("CountyScope")
            .with_inner_size([1500.0, 950.0])
            .with_min_inner_size([1000.0, 700.0]),
        wgpu_options: egui_wgpu::WgpuConfiguration {
            present_mode: eframe::wgpu::PresentMode::AutoVsync,
            wgpu_setup: egui_wgpu::WgpuSetup::CreateNew(egui_wgpu::WgpuSetupCreateNew {
                instance_descriptor: eframe::wgpu::InstanceDescriptor {
                    // Prefer DX12 on Windows; Vulkan and GL as fallbacks.
                    backends: eframe::wgpu::Backends::DX12
                        | eframe::wgpu::Backends::VULKAN
                        | eframe::wgpu::Backends::GL,
                    ..Default::default()
                },
                power_preference: eframe::wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    eframe::run_native(
        "CountyScope",
        options,
        Box::new(move |cc| Ok(Box::new(CountyScopeApp::new(cc, config)))),
    )
}
