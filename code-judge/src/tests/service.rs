use std::sync::Arc;

use super::utils::{defaults::request, outcomes::success};
use crate::{runner::MockExecutor, Error, JudgeService, LanguageRegistry, TestCase};

#[tokio::test]
async fn test_service_evaluates() -> crate::Result<()> {
    let mut executor = MockExecutor::new();
    executor.expect_run().returning(|_, _, _| Ok(success("Hello")));
    let service = JudgeService::new(executor, LanguageRegistry::default(), 2);

    let report = service
        .execute(&request("python", "print('Hello')", vec![TestCase::new("", "Hello")]))
        .await?;

    assert!(report.ok);
    assert_eq!(report.passed_count(), 1);
    assert_eq!(service.available_slots(), 2);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_executions() -> crate::Result<()> {
    let mut executor = MockExecutor::new();
    executor.expect_run().returning(|_, input, _| Ok(success(input)));
    let service = Arc::new(JudgeService::new(executor, LanguageRegistry::default(), 3));

    let mut handles = vec![];
    for i in 0..6 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let value = i.to_string();
            service
                .execute(&request("python", "...", vec![TestCase::new(value.clone(), value)]))
                .await
        }));
    }

    for handle in handles {
        let report = handle.await.unwrap()?;
        assert_eq!(report.passed_count(), 1);
    }
    assert_eq!(service.available_slots(), 3);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_rejects_new_work() {
    let mut executor = MockExecutor::new();
    executor.expect_run().never();
    let service = JudgeService::new(executor, LanguageRegistry::default(), 1);

    service.shutdown();
    let result = service
        .execute(&request("python", "...", vec![TestCase::new("", "")]))
        .await;

    assert!(matches!(result, Err(Error::Unavailable(_))));
}
