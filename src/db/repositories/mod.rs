mod progress;
mod stats;
