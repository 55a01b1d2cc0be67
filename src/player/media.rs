/// A streaming media element playing one URL at a time
///
/// Mirrors the usual browser/native audio element surface. Time-update and
/// ended notifications are fed to the tracker by its host.
pub trait MediaElement: Send {
    /// Assign a new source; playback position resets
    fn load(&mut self, url: &str);

    fn play(&mut self);

    fn pause(&mut self);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    /// Total length in seconds, `None` until known
    fn duration(&self) -> Option<f64>;

    /// Volume in `[0, 1]`
    fn set_volume(&mut self, volume: f64);
}
