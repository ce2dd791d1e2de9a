use crate::callable::Callable;

/// A step of a [`Compose`] pipeline after the first.
pub type Stage<T> = Box<dyn Fn(&T) -> T>;

/// A zero-argument producer, as used by [`Compose`] and [`Sequence`].
pub type Source<T> = Box<dyn Fn() -> T>;

/// Pipeline where each function consumes the previous function's result.
///
/// Running it calls the source, then every stage with the result before it,
/// and returns every intermediate result in order. Receiver and arguments of
/// a [`Callable`] call are ignored.
///
/// # Example
///
/// ```rust
/// use call_guard::combinators::Compose;
///
/// let pipeline = Compose::new(|| 2).then(|x| x * 10).then(|x| x + 1);
/// assert_eq!(pipeline.run(), vec![2, 20, 21]);
/// ```
pub struct Compose<T> {
    source: Source<T>,
    stages: Vec<Stage<T>>,
}

impl<T> Compose<T> {
    /// Starts a pipeline at `source`.
    pub fn new<S>(source: S) -> Self
    where
        S: Fn() -> T + 'static,
    {
        Self {
            source: Box::new(source),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    pub fn then<S>(mut self, stage: S) -> Self
    where
        S: Fn(&T) -> T + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of functions in the pipeline.
    pub fn len(&self) -> usize {
        self.stages.len() + 1
    }

    /// Always `false`: a pipeline has at least its source.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Runs the pipeline.
    pub fn run(&self) -> Vec<T> {
        let mut results = Vec::with_capacity(self.len());
        results.push((self.source)());
        for stage in &self.stages {
            let next = match results.last() {
                Some(previous) => stage(previous),
                None => break,
            };
            results.push(next);
        }
        results
    }
}

impl<C, A, T> Callable<C, A> for Compose<T> {
    type Output = Vec<T>;

    fn invoke(&self, _receiver: &C, _args: Vec<A>) -> Vec<T> {
        self.run()
    }
}

/// Independent functions run one after the other, results collected in call
/// order. No function sees another's result.
///
/// # Example
///
/// ```rust
/// use call_guard::combinators::Sequence;
///
/// let checks = Sequence::new().then(|| "disk").then(|| "net");
/// assert_eq!(checks.run(), vec!["disk", "net"]);
/// ```
pub struct Sequence<T> {
    steps: Vec<Source<T>>,
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sequence<T> {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a function.
    pub fn then<S>(mut self, step: S) -> Self
    where
        S: Fn() -> T + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    /// Returns the number of functions.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every function in order.
    pub fn run(&self) -> Vec<T> {
        self.steps.iter().map(|step| step()).collect()
    }
}

impl<C, A, T> Callable<C, A> for Sequence<T> {
    type Output = Vec<T>;

    fn invoke(&self, _receiver: &C, _args: Vec<A>) -> Vec<T> {
        self.run()
    }
}

/// Builds a [`Compose`] pipeline from a source and its stages.
pub fn compose<T, S>(source: S, stages: Vec<Stage<T>>) -> Compose<T>
where
    S: Fn() -> T + 'static,
{
    Compose {
        source: Box::new(source),
        stages,
    }
}

/// Builds a [`Sequence`] from independent functions.
pub fn sequencial<T>(steps: Vec<Source<T>>) -> Sequence<T> {
    Sequence { steps }
}
