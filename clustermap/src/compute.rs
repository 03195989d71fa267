use crate::cluster::{cluster_incremental, partition, ClusterParams, ClusterSet, Generation};
use crate::error::ClusterError;
use crate::item::ClusterItem;
use crate::messenger::Messenger;
use crate::overlay::{DiscardReason, RenderMessage};
use crate::state::GenerationToken;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub(crate) enum ComputeRequest<I> {
    Full {
        generation: Generation,
        items: Arc<[Arc<I>]>,
        params: ClusterParams,
    },
    Incremental {
        generation: Generation,
        item: Arc<I>,
    },
    Shutdown,
}

/// Handle of the background context that runs clustering passes one after another.
pub(crate) struct ComputeWorker<I: ClusterItem> {
    sender: mpsc::UnboundedSender<ComputeRequest<I>>,
}

impl<I: ClusterItem> ComputeWorker<I> {
    pub(crate) fn spawn(
        handle: &Handle,
        token: GenerationToken,
        output: mpsc::UnboundedSender<RenderMessage<I>>,
        messenger: Option<Arc<dyn Messenger>>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let context = ComputeContext {
            token,
            output,
            messenger,
            latest: None,
        };
        handle.spawn(context.run(receiver));

        Self { sender }
    }

    /// Enqueues the request. Returns false if the worker is stopped.
    pub(crate) fn submit(&self, request: ComputeRequest<I>) -> bool {
        self.sender.send(request).is_ok()
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.sender.send(ComputeRequest::Shutdown);
    }
}

struct ComputeContext<I: ClusterItem> {
    token: GenerationToken,
    output: mpsc::UnboundedSender<RenderMessage<I>>,
    messenger: Option<Arc<dyn Messenger>>,
    latest: Option<Arc<ClusterSet<I>>>,
}

impl<I: ClusterItem> ComputeContext<I> {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<ComputeRequest<I>>) {
        while let Some(request) = requests.recv().await {
            let message = match request {
                ComputeRequest::Full {
                    generation,
                    items,
                    params,
                } => self.full(generation, items, params).await,
                ComputeRequest::Incremental { generation, item } => {
                    self.incremental(generation, item)
                }
                ComputeRequest::Shutdown => break,
            };

            self.post(message);
        }

        log::debug!("Compute worker stopped");
    }

    async fn full(
        &mut self,
        generation: Generation,
        items: Arc<[Arc<I>]>,
        params: ClusterParams,
    ) -> RenderMessage<I> {
        if !self.token.is_current(generation) {
            log::debug!("Skipping superseded recompute {generation}");
            return RenderMessage::Discarded {
                generation,
                reason: DiscardReason::Superseded,
            };
        }

        log::debug!(
            "Clustering {} items for {generation} with threshold {:.1} m",
            items.len(),
            params.threshold
        );

        let token = self.token.clone();
        let result = tokio::task::spawn_blocking(move || {
            partition(&items, params, || !token.is_current(generation))
        })
        .await;

        match result {
            Ok(Some(clusters)) => {
                let set = Arc::new(ClusterSet::new(generation, params, clusters));
                log::debug!("Recompute {generation} produced {} clusters", set.clusters().len());
                self.latest = Some(set.clone());
                RenderMessage::Apply(set)
            }
            Ok(None) => {
                log::debug!("Recompute {generation} was cancelled");
                RenderMessage::Discarded {
                    generation,
                    reason: DiscardReason::Cancelled,
                }
            }
            Err(err) => {
                log::error!("Clustering task for {generation} failed: {err}");
                RenderMessage::Discarded {
                    generation,
                    reason: DiscardReason::Failed(ClusterError::Compute(err.to_string())),
                }
            }
        }
    }

    fn incremental(&mut self, generation: Generation, item: Arc<I>) -> RenderMessage<I> {
        if !self.token.is_current(generation) {
            return RenderMessage::Discarded {
                generation,
                reason: DiscardReason::Superseded,
            };
        }

        let Some(latest) = self
            .latest
            .as_ref()
            .filter(|set| set.generation() == generation)
        else {
            log::debug!("No cluster set for {generation}, skipping incremental update");
            return RenderMessage::Discarded {
                generation,
                reason: DiscardReason::NotReady,
            };
        };

        let outcome = cluster_incremental(item, latest.clusters(), latest.params());
        let (set, index) = latest.with_outcome(outcome);
        let set = Arc::new(set);
        self.latest = Some(set.clone());

        RenderMessage::ApplySingle { set, index }
    }

    fn post(&self, message: RenderMessage<I>) {
        if self.output.send(message).is_err() {
            log::debug!("Cluster overlay is dropped, result is discarded");
            return;
        }

        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }
}
