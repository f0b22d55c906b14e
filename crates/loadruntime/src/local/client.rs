use super::{await_result, PlatformInner, StartRequest};
use crate::client::{
    ClientError, StartWorkflowOptions, WorkflowClient, WorkflowDescription, WorkflowExecution,
};
use async_trait::async_trait;
use loadcore::Payload;
use std::sync::Arc;

/// Client for workflows hosted by a [`LocalPlatform`](super::LocalPlatform)
#[derive(Clone)]
pub struct LocalClient {
    inner: Arc<PlatformInner>,
}

impl LocalClient {
    pub(crate) fn new(inner: Arc<PlatformInner>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl WorkflowClient for LocalClient {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    async fn start_workflow(
        &self,
        options: StartWorkflowOptions,
        workflow_type: &str,
        args: Vec<Payload>,
    ) -> Result<WorkflowExecution, ClientError> {
        self.inner.start_run(StartRequest {
            workflow_id: options.id,
            workflow_type: workflow_type.to_string(),
            task_queue: options.task_queue,
            args,
            run_timeout: options.run_timeout,
            id_reuse_policy: options.id_reuse_policy,
            error_when_already_started: options.error_when_already_started,
            search_attributes: options.search_attributes,
            memo: options.memo,
        })
    }

    async fn get_result(
        &self,
        execution: &WorkflowExecution,
    ) -> Result<Option<Payload>, ClientError> {
        await_result(&Arc::downgrade(&self.inner), execution).await
    }

    async fn signal_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
        signal_name: &str,
        args: Vec<Payload>,
    ) -> Result<(), ClientError> {
        self.inner
            .signal(workflow_id, run_id, signal_name, args)
            .await
    }

    async fn update_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
        update_name: &str,
        args: Vec<Payload>,
    ) -> Result<Payload, ClientError> {
        self.inner
            .update(workflow_id, run_id, update_name, args)
            .await
    }

    async fn query_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
        query_type: &str,
    ) -> Result<Payload, ClientError> {
        self.inner.query(workflow_id, run_id, query_type).await
    }

    async fn cancel_workflow(&self, workflow_id: &str, run_id: &str) -> Result<(), ClientError> {
        self.inner.cancel(workflow_id, run_id)
    }

    async fn terminate_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
        reason: &str,
    ) -> Result<(), ClientError> {
        self.inner.terminate(workflow_id, run_id, reason)
    }

    async fn describe_workflow(
        &self,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<WorkflowDescription, ClientError> {
        self.inner.describe(workflow_id, run_id)
    }
}
