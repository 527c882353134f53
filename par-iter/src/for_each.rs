use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[doc(hidden)]
pub(super) struct ForEach<P> {
    producer: P,
    config: ThreadConfig,
}

impl<P> ForEach<P>
where
    P: ParallelProducer,
{
    pub fn new(producer: P, config: ThreadConfig) -> Self {
        Self { producer, config }
    }

    /// Executes the parallel iteration and joins every worker before returning.
    pub fn for_each<F>(self, f: F)
    where
        F: Fn(P::Item) + Send + Sync,
    {
        let total_items = self.producer.len();
        if total_items == 0 {
            return;
        }

        let num_threads = self.config.threads_for(total_items);
        if num_threads == 1 {
            // SAFETY: every index in 0..total_items is requested once.
            (0..total_items)
                .filter_map(|i| unsafe { self.producer.get_item(i) })
                .for_each(&f);
            return;
        }

        let batch_size = self.config.batch_for(total_items, num_threads);
        let cursor = AtomicUsize::new(0);
        let producer = &self.producer;
        let cursor = &cursor;
        let f = &f;

        thread::scope(|s| {
            for _ in 0..num_threads {
                s.spawn(move || {
                    loop {
                        let start = cursor.fetch_add(batch_size, Ordering::Relaxed);
                        if start >= total_items {
                            break;
                        }
                        let end = (start + batch_size).min(total_items);
                        // SAFETY: the cursor hands each batch, and so each index, to one worker.
                        (start..end)
                            .filter_map(|i| unsafe { producer.get_item(i) })
                            .for_each(f);
                    }
                });
            }
        });
    }
}
