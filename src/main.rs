#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    analytics_dashboard::desktop::run();
}
