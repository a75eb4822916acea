pub trait TimeProvider {
    fn uptime_ms(&self) -> u64;
}
