// Reference lap timing: intervals, validated tables, and tables derived
// from per-driver telemetry.

mod interval;
mod telemetry;
mod windows;

pub use interval::{LapInterval, LapTable};
pub use telemetry::{average_laps, filter_driver, to_table, AveragedLap, DriverLap};
pub use windows::{attach_windows, LapWindow};
