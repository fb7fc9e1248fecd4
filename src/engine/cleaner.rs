use std::marker::PhantomData;

use validator::Validate;

use crate::{
    engine::types::{CleaningOutcome, CleaningSummary, PipelineConfig},
    error::{CleaningError, configuration_error, input_missing},
    event::ports::{Cleanable, EventContext, ObjectSource, ResultSink},
    overlap::{ports::OverlapTest, registry::OverlapTestRegistry},
    predicate::Predicate,
};

/// Cleans one collection kind per event: preselection, ordered overlap tests,
/// final cut. Owns its overlap tests, so separate engines share nothing.
pub struct CleaningEngine<T> {
    name: String,
    source: String,
    preselection: Predicate,
    final_cut: Predicate,
    overlap_tests: Vec<Box<dyn OverlapTest>>,
    fingerprint: String,
    _object: PhantomData<fn() -> T>,
}

impl<T: Cleanable> CleaningEngine<T> {
    pub fn from_config(
        config: &PipelineConfig,
        registry: &OverlapTestRegistry,
    ) -> Result<Self, CleaningError> {
        config.validate().map_err(|err| {
            configuration_error(format!("pipeline '{}': invalid config: {err}", config.name))
        })?;

        let preselection = compile_cut(&config.name, "preselection", &config.preselection)?;
        let final_cut = compile_cut(&config.name, "final_cut", &config.final_cut)?;
        let overlap_tests = registry.build_all(&config.overlap_tests).map_err(|err| {
            configuration_error(format!("pipeline '{}': {}", config.name, err.message))
        })?;
        let fingerprint = config.fingerprint()?;

        tracing::info!(
            target: "cleaner",
            pipeline = %config.name,
            source = %config.source,
            overlap_tests = ?config
                .overlap_tests
                .iter()
                .map(|test| test.name.as_str())
                .collect::<Vec<_>>(),
            fingerprint = %fingerprint,
            "pipeline_constructed"
        );

        Ok(Self {
            name: config.name.clone(),
            source: config.source.clone(),
            preselection,
            final_cut,
            overlap_tests,
            fingerprint,
            _object: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn overlap_test_names(&self) -> Vec<&str> {
        self.overlap_tests.iter().map(|test| test.name()).collect()
    }

    /// Runs the full pass over one event. Either the whole cleaned collection is
    /// returned or an error is; nothing partial escapes.
    #[tracing::instrument(
        name = "clean_event",
        level = "debug",
        skip_all,
        fields(pipeline = %self.name, event_id = event.event_id())
    )]
    pub fn clean<E>(&mut self, event: &E) -> Result<CleaningOutcome<T>, CleaningError>
    where
        E: EventContext + ObjectSource<T>,
    {
        for test in &mut self.overlap_tests {
            test.refresh(event)?;
        }

        let inputs = event.objects(&self.source).ok_or_else(|| {
            input_missing(format!(
                "pipeline '{}': source collection '{}' not found in event {}",
                self.name,
                self.source,
                event.event_id()
            ))
        })?;

        let mut summary = CleaningSummary {
            event_id: event.event_id(),
            input: inputs.len(),
            ..CleaningSummary::default()
        };
        let mut objects = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.iter().enumerate() {
            if !self.preselection.evaluate(input) {
                continue;
            }
            summary.preselected += 1;

            let mut staged = input.clone();
            staged.clear_overlaps();
            if let Some(test) = self.annotate(&mut staged) {
                summary.rejected_by_overlap += 1;
                tracing::trace!(target: "cleaner", index, test = %test, "overlap_rejected");
                continue;
            }

            if !self.final_cut.evaluate(&staged) {
                summary.rejected_by_final_cut += 1;
                tracing::trace!(target: "cleaner", index, "final_cut_rejected");
                continue;
            }
            objects.push(staged);
        }
        summary.accepted = objects.len();

        tracing::debug!(
            target: "cleaner",
            input = summary.input,
            preselected = summary.preselected,
            rejected_by_overlap = summary.rejected_by_overlap,
            rejected_by_final_cut = summary.rejected_by_final_cut,
            accepted = summary.accepted,
            "event_cleaned"
        );

        Ok(CleaningOutcome { objects, summary })
    }

    /// Cleans `event` and commits the output to `sink` only on success.
    pub fn run_event<E, S>(&mut self, event: &E, sink: &mut S) -> Result<CleaningSummary, CleaningError>
    where
        E: EventContext + ObjectSource<T>,
        S: ResultSink<T> + ?Sized,
    {
        let outcome = self.clean(event)?;
        sink.commit(event.event_id(), &self.name, outcome.objects);
        Ok(outcome.summary)
    }

    /// Applies the overlap tests in order. Returns the name of the test that
    /// rejected the object; tests after it are not evaluated.
    fn annotate(&self, staged: &mut T) -> Option<&str> {
        for test in &self.overlap_tests {
            let outcome = test.evaluate(&*staged);
            if outcome.has_overlap && test.require_no_overlap() {
                return Some(test.name());
            }
            staged.set_overlaps(test.name(), outcome.overlaps);
        }
        None
    }
}

fn compile_cut(pipeline: &str, which: &str, expression: &str) -> Result<Predicate, CleaningError> {
    Predicate::compile(expression).map_err(|err| {
        configuration_error(format!("pipeline '{pipeline}': {which}: {}", err.message))
    })
}
