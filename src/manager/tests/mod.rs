use super::*;
use crate::manager::test_helpers::{
    ScriptedFetcher, TEST_TIMEOUT, create_test_manager, test_config,
};
use crate::types::{FileStatus, TaskStatus};


/// Wait for a task to finish, failing the test after [`TEST_TIMEOUT`]
async fn finished(manager: &TaskManager, id: &TaskId) -> Task {
    tokio::time::timeout(TEST_TIMEOUT, manager.wait_for_task(id))
        .await
        .expect("task did not finish in time")
        .unwrap()
}
