pub mod donut_panel;
pub mod hist_panel;
pub mod map_panel;
pub mod pca_panel;
pub mod pcp_panel;
pub mod plot_frame;
pub mod widgets;
