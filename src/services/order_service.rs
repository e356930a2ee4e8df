use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::{OrderRecord, OrdersView, ServiceError, ServiceResult};
use crate::repositories::OrderHistory;

/// Service backing the orders page
pub struct OrderService {
    repository: Arc<dyn OrderHistory>,
}

impl OrderService {
    /// Create a new OrderService
    pub fn new(repository: Arc<dyn OrderHistory>) -> Self {
        Self { repository }
    }

    /// Orders whose studio name matches `query`, split into ongoing and completed
    #[instrument(skip(self))]
    pub fn search(&self, query: &str) -> ServiceResult<OrdersView> {
        let orders = self.repository.list_orders()?;
        let total = orders.len();

        let view = OrdersView::partition(
            orders
                .into_iter()
                .filter(|order| order.matches_search(query)),
        );

        info!(
            total,
            ongoing = view.ongoing.len(),
            completed = view.completed.len(),
            "Orders searched"
        );
        Ok(view)
    }

    #[instrument(skip(self))]
    pub fn get_order(&self, order_id: &str) -> ServiceResult<OrderRecord> {
        self.repository
            .find_order_by_id(order_id)?
            .ok_or_else(|| ServiceError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    /// Cancel an order; unknown ids are an error
    #[instrument(skip(self))]
    pub fn cancel(&self, order_id: &str) -> ServiceResult<()> {
        if !self.repository.cancel_order(order_id)? {
            return Err(ServiceError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        }

        info!("Order cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderStatus, RepositoryResult};
    use mockall::mock;

    mock! {
        TestOrderHistory {}

        impl OrderHistory for TestOrderHistory {
            fn find_order_by_id(&self, order_id: &str) -> RepositoryResult<Option<OrderRecord>>;
            fn list_orders(&self) -> RepositoryResult<Vec<OrderRecord>>;
            fn cancel_order(&self, order_id: &str) -> RepositoryResult<bool>;
        }
    }

    fn create_test_orders() -> Vec<OrderRecord> {
        vec![
            OrderRecord::new("1", OrderStatus::Ongoing).with_studio_name("Busy Bee"),
            OrderRecord::new("2", OrderStatus::Completed).with_studio_name("Quick Wash"),
            OrderRecord::new("3", OrderStatus::Completed).with_studio_name("Busy Bee Express"),
        ]
    }

    #[test]
    fn test_search_filters_and_partitions() {
        let mut mock_repo = MockTestOrderHistory::new();
        mock_repo
            .expect_list_orders()
            .times(1)
            .returning(|| Ok(create_test_orders()));

        let service = OrderService::new(Arc::new(mock_repo));
        let view = service.search("busy").unwrap();

        assert_eq!(view.ongoing.len(), 1);
        assert_eq!(view.completed.len(), 1);
        assert_eq!(view.completed[0].id, "3");
    }

    #[test]
    fn test_empty_search_lists_everything() {
        let mut mock_repo = MockTestOrderHistory::new();
        mock_repo
            .expect_list_orders()
            .returning(|| Ok(create_test_orders()));

        let service = OrderService::new(Arc::new(mock_repo));
        let view = service.search("").unwrap();

        assert_eq!(view.ongoing.len() + view.completed.len(), 3);
    }

    #[test]
    fn test_get_order_not_found() {
        let mut mock_repo = MockTestOrderHistory::new();
        mock_repo.expect_find_order_by_id().returning(|_| Ok(None));

        let service = OrderService::new(Arc::new(mock_repo));

        match service.get_order("missing") {
            Err(ServiceError::OrderNotFound { order_id }) => assert_eq!(order_id, "missing"),
            other => panic!("Expected OrderNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_order() {
        let mut mock_repo = MockTestOrderHistory::new();
        mock_repo
            .expect_cancel_order()
            .withf(|order_id| order_id == "1")
            .times(1)
            .returning(|_| Ok(true));

        let service = OrderService::new(Arc::new(mock_repo));
        assert!(service.cancel("1").is_ok());
    }

    #[test]
    fn test_cancel_unknown_order() {
        let mut mock_repo = MockTestOrderHistory::new();
        mock_repo.expect_cancel_order().returning(|_| Ok(false));

        let service = OrderService::new(Arc::new(mock_repo));

        assert!(matches!(
            service.cancel("nope"),
            Err(ServiceError::OrderNotFound { .. })
        ));
    }
}
