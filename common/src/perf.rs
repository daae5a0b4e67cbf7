use std::time::{Duration, Instant};

/// Accumulates wall-clock time spent in one phase of a tool (reading the
/// index, unpacking, writing...).
#[derive(Debug)]
pub struct PhaseTimer {
    name: &'static str,
    runs: u64,
    total: Duration,
    started: Option<Instant>,
}

impl PhaseTimer {
    pub fn new(name: &'static str) -> Self {
        PhaseTimer {
            name,
            runs: 0,
            total: Duration::default(),
            started: None,
        }
    }

    /// Starts measuring.
    ///
    /// # Panics
    /// Panics when the timer is already running.
    pub fn start(&mut self) {
        match self.started {
            Some(_) => panic!("PhaseTimer `{}` must end() before start()-ing again!", self.name),
            None => self.started = Some(Instant::now()),
        }
    }

    /// Stops measuring and adds the elapsed time to the total.
    ///
    /// # Panics
    /// Panics when the timer is not running.
    pub fn end(&mut self) {
        match self.started.take() {
            None => panic!("PhaseTimer `{}` must start() before end()-ing!", self.name),
            Some(s) => {
                self.total += s.elapsed();
                self.runs += 1;
            }
        }
    }

    /// Starts the timer and returns a guard that ends it when dropped.
    pub fn measure(&mut self) -> Measure<'_> {
        self.start();
        Measure(self)
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    #[inline]
    pub fn total_time(&self) -> Duration {
        self.total
    }
}

/// Guard returned by `PhaseTimer::measure()`.
pub struct Measure<'a>(&'a mut PhaseTimer);

impl Drop for Measure<'_> {
    fn drop(&mut self) {
        self.0.end();
    }
}

/// Generates a struct with one `PhaseTimer` per listed phase, a `Default`
/// implementation and a `phases()` accessor for printing.
///
/// ```rust
/// common::phase_stats!(pub Statistics; load, save);
///
/// let mut stats = Statistics::default();
/// {
///     let _m = stats.load.measure();
/// }
/// assert_eq!(stats.load.runs(), 1);
/// assert_eq!(stats.phases().len(), 2);
/// ```
#[macro_export]
macro_rules! phase_stats {
    (pub $name: ident; $($it: ident),+) => {
        #[derive(Debug)]
        pub struct $name {
            $(pub $it: $crate::perf::PhaseTimer,)+
        }

        $crate::phase_stats!(@impl $name; $($it),+);
    };
    ($name: ident; $($it: ident),+) => {
        #[derive(Debug)]
        struct $name {
            $($it: $crate::perf::PhaseTimer,)+
        }

        $crate::phase_stats!(@impl $name; $($it),+);
    };
    (@impl $name: ident; $($it: ident),+) => {
        impl Default for $name {
            fn default() -> Self {
                $name {
                    $($it: $crate::perf::PhaseTimer::new(stringify!($it)),)+
                }
            }
        }

        impl $name {
            #[allow(dead_code)]
            pub fn phases(&self) -> Vec<&$crate::perf::PhaseTimer> {
                vec![$(&self.$it,)+]
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::perf::PhaseTimer;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn timer_creates_empty() {
        let timer = PhaseTimer::new("index");

        assert_eq!(timer.runs(), 0);
        assert_eq!(timer.total_time(), Duration::default());
        assert_eq!(timer.name(), "index");
    }

    #[test]
    fn measure_guard_counts_time() {
        let mut timer = PhaseTimer::new("unpack");
        {
            let _m = timer.measure();
            sleep(Duration::from_millis(5));
        }
        {
            let _m = timer.measure();
        }

        assert_eq!(timer.runs(), 2);
        assert!(timer.total_time() >= Duration::from_millis(5));
    }

    #[test]
    #[should_panic]
    fn double_start_panics() {
        let mut timer = PhaseTimer::new("root");
        timer.start();
        timer.start();
    }

    #[test]
    #[should_panic]
    fn end_without_start_panics() {
        let mut timer = PhaseTimer::new("root");
        timer.end();
    }

    crate::phase_stats!(Stats; first, second);

    #[test]
    fn generated_struct_lists_phases() {
        let stats = Stats::default();
        let names: Vec<_> = stats.phases().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
