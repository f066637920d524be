// Background prefetch — worker threads load batches ahead of the consumer
//
// Workers pull (batch index, example indices) jobs off a shared queue, so
// every batch is loaded by exactly one worker. Finished batches flow back
// through a bounded channel; the iterator reorders them so the consumer
// always sees batch 0, 1, 2, ... regardless of which worker finished
// first.

use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use crate::provider::{load_batch, SequenceProvider};
use crate::sample::Batch;
use crate::Result;

type Job = (usize, Vec<usize>);

/// One epoch's worth of batches, prefetched by background workers and
/// yielded in batch-index order.
///
/// Dropping the iterator early drains and joins the workers.
pub struct EpochIterator {
    receiver: Receiver<(usize, Result<Batch>)>,
    queue: Arc<Mutex<std::vec::IntoIter<Job>>>,
    workers: Vec<JoinHandle<()>>,
    /// Out-of-order arrivals waiting for their turn.
    pending: BTreeMap<usize, Result<Batch>>,
    next_idx: usize,
    total: usize,
}

impl EpochIterator {
    pub(crate) fn spawn(provider: &SequenceProvider) -> EpochIterator {
        let total = provider.num_batches();
        let bs = provider.config.batch_size;

        let jobs: Vec<Job> = provider
            .order
            .chunks(bs)
            .enumerate()
            .map(|(i, chunk)| (i, chunk.to_vec()))
            .collect();
        let queue = Arc::new(Mutex::new(jobs.into_iter()));

        let n_workers = provider.config.workers.max(1).min(total.max(1));
        let (sender, receiver) = mpsc::sync_channel(provider.config.queue_size.max(1));

        let mut workers = Vec::with_capacity(n_workers);
        for _ in 0..n_workers {
            let queue = Arc::clone(&queue);
            let sender: SyncSender<(usize, Result<Batch>)> = sender.clone();
            let config = provider.config.clone();
            let class_names = Arc::clone(&provider.class_names);
            let examples = Arc::clone(&provider.examples);
            workers.push(std::thread::spawn(move || loop {
                let job = {
                    let mut guard = match queue.lock() {
                        Ok(g) => g,
                        Err(_) => return,
                    };
                    guard.next()
                };
                let Some((idx, indices)) = job else { return };
                let batch = load_batch(&config, &class_names, &examples, &indices);
                // Send fails only when the consumer was dropped; stop
                // quietly in that case.
                if sender.send((idx, batch)).is_err() {
                    return;
                }
            }));
        }
        drop(sender);

        EpochIterator {
            receiver,
            queue,
            workers,
            pending: BTreeMap::new(),
            next_idx: 0,
            total,
        }
    }
}

impl Iterator for EpochIterator {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_idx >= self.total {
            return None;
        }
        loop {
            if let Some(batch) = self.pending.remove(&self.next_idx) {
                self.next_idx += 1;
                return Some(batch);
            }
            match self.receiver.recv() {
                Ok((idx, batch)) => {
                    self.pending.insert(idx, batch);
                }
                // All workers gone with the next batch missing; nothing
                // more will arrive.
                Err(_) => return None,
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next_idx;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EpochIterator {}

impl Drop for EpochIterator {
    fn drop(&mut self) {
        // Empty the job queue so idle workers exit, then drain the channel
        // until every sender disconnects so no worker stays blocked on a
        // full channel mid-send.
        if let Ok(mut guard) = self.queue.lock() {
            while guard.next().is_some() {}
        }
        while self.receiver.recv().is_ok() {}
        self.pending.clear();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
