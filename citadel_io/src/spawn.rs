/// Spawns a named OS thread. Unlike `std::thread::spawn`, a failure to create the thread
/// is returned to the caller instead of panicking
pub fn spawn_thread<F, R>(
    name: impl Into<String>,
    f: F,
) -> std::io::Result<std::thread::JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    std::thread::Builder::new().name(name.into()).spawn(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_thread_is_named() {
        let handle = spawn_thread("pipe-test-thread", || {
            std::thread::current().name().map(ToString::to_string)
        })
        .unwrap();
        assert_eq!(handle.join().unwrap().as_deref(), Some("pipe-test-thread"));
    }

    #[test]
    fn spawn_thread_propagates_panic_through_join() {
        let handle = spawn_thread("pipe-test-panic", || -> u8 { panic!("boom") }).unwrap();
        assert!(handle.join().is_err());
    }
}
