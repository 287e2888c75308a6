//! Stochastic job arrivals.
//!
//! Each tick, every stream draws an arrival count from a Poisson
//! distribution with mean `arrivals_per_hour / 60 * step_minutes`, then draws
//! each job's GPU requirement and duration uniformly from the stream's
//! inclusive ranges.
//!
//! All draws come from one seeded [`ChaCha8Rng`] in a fixed order: streams in
//! config order, and within a stream the count first, then per job the GPU
//! requirement followed by the duration. That order is what makes a run
//! reproducible bit for bit.

use crate::config::JobStreamConfig;
use crate::job::Job;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};

/// Mean arrivals per tick for `stream`.
pub fn arrival_mean(stream: &JobStreamConfig, step_minutes: u64) -> f64 {
    stream.arrivals_per_hour / 60.0 * step_minutes as f64
}

/// One stream's arrival process with its Poisson distribution built up front.
///
/// The distribution is `None` when the mean is zero, so an idle stream never
/// touches the random source.
#[derive(Debug, Clone)]
pub struct StreamSampler {
    stream: JobStreamConfig,
    arrivals: Option<Poisson<f64>>,
}

impl StreamSampler {
    pub fn new(stream: JobStreamConfig, step_minutes: u64) -> Self {
        let mean = arrival_mean(&stream, step_minutes);
        let arrivals = if mean > 0.0 {
            Poisson::new(mean).ok()
        } else {
            None
        };
        Self { stream, arrivals }
    }

    /// Draw this tick's jobs. Ids come from `next_job_id`, which is advanced
    /// past the last id handed out.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        minute: u64,
        next_job_id: &mut u64,
    ) -> Vec<Job> {
        let Some(poisson) = &self.arrivals else {
            return Vec::new();
        };
        let count = poisson.sample(rng) as u64;
        let stream = &self.stream;

        let mut jobs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let gpus_required = rng.gen_range(stream.gpus_required_min..=stream.gpus_required_max);
            let duration_minutes =
                rng.gen_range(stream.duration_minutes_min..=stream.duration_minutes_max);
            jobs.push(Job {
                id: *next_job_id,
                kind: stream.job_type,
                gpus_required,
                duration_minutes,
                arrival_minute: minute,
                priority: stream.priority,
                sla_wait_minutes: stream.sla_wait_minutes,
                placement: None,
            });
            *next_job_id += 1;
        }
        jobs
    }
}

/// Generate one stream's arrivals for a single tick.
pub fn sample_stream<R: Rng + ?Sized>(
    rng: &mut R,
    stream: &JobStreamConfig,
    minute: u64,
    step_minutes: u64,
    next_job_id: &mut u64,
) -> Vec<Job> {
    StreamSampler::new(stream.clone(), step_minutes).sample(rng, minute, next_job_id)
}

/// Arrival process for a whole run: the shared random source, the id counter
/// and one sampler per stream.
#[derive(Debug, Clone)]
pub struct ArrivalGenerator {
    rng: ChaCha8Rng,
    samplers: Vec<StreamSampler>,
    next_job_id: u64,
}

impl ArrivalGenerator {
    /// Job ids start at 1.
    pub fn new(seed: u64, streams: Vec<JobStreamConfig>, step_minutes: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            samplers: streams
                .into_iter()
                .map(|s| StreamSampler::new(s, step_minutes))
                .collect(),
            next_job_id: 1,
        }
    }

    /// All streams' arrivals for `minute`, in stream order.
    pub fn generate(&mut self, minute: u64) -> Vec<Job> {
        let mut jobs = Vec::new();
        for sampler in &self.samplers {
            jobs.extend(sampler.sample(&mut self.rng, minute, &mut self.next_job_id));
        }
        jobs
    }

    /// Id the next generated job will receive.
    pub fn next_job_id(&self) -> u64 {
        self.next_job_id
    }
}
