use crate::error::EngineError;
use crate::model::{InventoryItem, MovementContext, DEFAULT_LOCATION};
use crate::proto::inventory_service_server::{InventoryService, InventoryServiceServer};
use crate::proto::{
    AdjustStockRequest, AvailabilityResponse, BulkCheckAvailabilityRequest,
    BulkCheckAvailabilityResponse, CheckAvailabilityRequest, CommitReservationRequest,
    GetStockRequest, LocationAvailability, ReleaseReservationRequest, ReserveStockRequest,
    ReserveStockResponse, StockResponse,
};
use crate::{query, store, AppState};
use tonic::{Request, Response, Status};
use tracing::warn;

/// Typed intra-cluster surface. Business failures stay inside the response
/// (`success = false`); a gRPC status only ever signals a transport fault.
pub struct InventoryRpc {
    state: AppState,
}

impl InventoryRpc {
    pub fn new(state: AppState) -> Self {
        InventoryRpc { state }
    }

    pub fn into_server(self) -> InventoryServiceServer<InventoryRpc> {
        InventoryServiceServer::new(self)
    }
}

fn location_or_default(location: &str) -> &str {
    if location.is_empty() {
        DEFAULT_LOCATION
    } else {
        location
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn stock_ok(item: &InventoryItem) -> StockResponse {
    StockResponse {
        success: true,
        error: String::new(),
        sku: item.sku.clone(),
        location: item.location.clone(),
        quantity_on_hand: item.quantity_on_hand,
        quantity_reserved: item.quantity_reserved,
        quantity_available: item.quantity_available,
        in_stock: item.in_stock(),
        backorderable: item.backorderable,
    }
}

fn stock_err(sku: &str, location: &str, err: &EngineError) -> StockResponse {
    warn!(sku, location, kind = err.kind(), error = %err, "stock rpc rejected");
    StockResponse {
        success: false,
        error: err.rpc_error(),
        sku: sku.to_string(),
        location: location.to_string(),
        ..Default::default()
    }
}

#[tonic::async_trait]
impl InventoryService for InventoryRpc {
    async fn get_stock(
        &self,
        request: Request<GetStockRequest>,
    ) -> Result<Response<StockResponse>, Status> {
        let req = request.into_inner();
        let location = location_or_default(&req.location).to_string();
        let result = store::get_item(&self.state.db, &req.sku, &location).await;
        let response = match result {
            Ok(Some(item)) => stock_ok(&item),
            Ok(None) => stock_err(
                &req.sku,
                &location,
                &EngineError::NotFound { sku: req.sku.clone(), location: location.clone() },
            ),
            Err(err) => stock_err(&req.sku, &location, &EngineError::Database(err)),
        };
        Ok(Response::new(response))
    }

    async fn adjust_stock(
        &self,
        request: Request<AdjustStockRequest>,
    ) -> Result<Response<StockResponse>, Status> {
        let req = request.into_inner();
        let location = location_or_default(&req.location).to_string();
        let ctx = MovementContext {
            reason: non_empty(req.reason),
            reference_type: non_empty(req.reference_type),
            reference_id: non_empty(req.reference_id),
            metadata: None,
        };
        let response = match self.state.engine.adjust(&req.sku, &location, req.quantity, &ctx).await
        {
            Ok(transition) => stock_ok(&transition.item),
            Err(err) => stock_err(&req.sku, &location, &err),
        };
        Ok(Response::new(response))
    }

    async fn reserve_stock(
        &self,
        request: Request<ReserveStockRequest>,
    ) -> Result<Response<ReserveStockResponse>, Status> {
        let req = request.into_inner();
        let location = location_or_default(&req.location).to_string();
        let ctx = MovementContext {
            reference_type: non_empty(req.reference_type),
            reference_id: non_empty(req.reference_id),
            ..Default::default()
        };
        let response = match self.state.engine.reserve(&req.sku, &location, req.quantity, &ctx).await
        {
            Ok(outcome) => {
                let stock = stock_ok(&outcome.item);
                ReserveStockResponse {
                    success: true,
                    error: String::new(),
                    sku: stock.sku,
                    location: stock.location,
                    quantity_on_hand: stock.quantity_on_hand,
                    quantity_reserved: stock.quantity_reserved,
                    quantity_available: stock.quantity_available,
                    in_stock: stock.in_stock,
                    backorderable: stock.backorderable,
                    reservation_id: outcome.reservation_id,
                }
            }
            Err(err) => {
                let stock = stock_err(&req.sku, &location, &err);
                ReserveStockResponse {
                    success: false,
                    error: stock.error,
                    sku: stock.sku,
                    location: stock.location,
                    ..Default::default()
                }
            }
        };
        Ok(Response::new(response))
    }

    async fn release_reservation(
        &self,
        request: Request<ReleaseReservationRequest>,
    ) -> Result<Response<StockResponse>, Status> {
        let req = request.into_inner();
        let location = location_or_default(&req.location).to_string();
        let ctx = MovementContext {
            reference_type: non_empty(req.reference_type),
            reference_id: non_empty(req.reference_id),
            ..Default::default()
        };
        let response = match self.state.engine.release(&req.sku, &location, req.quantity, &ctx).await
        {
            Ok(transition) => stock_ok(&transition.item),
            Err(err) => stock_err(&req.sku, &location, &err),
        };
        Ok(Response::new(response))
    }

    async fn commit_reservation(
        &self,
        request: Request<CommitReservationRequest>,
    ) -> Result<Response<StockResponse>, Status> {
        let req = request.into_inner();
        let location = location_or_default(&req.location).to_string();
        let ctx = MovementContext {
            reference_type: non_empty(req.reference_type),
            reference_id: non_empty(req.reference_id),
            ..Default::default()
        };
        let response = match self
            .state
            .engine
            .commit_reservation(&req.sku, &location, req.quantity, &ctx)
            .await
        {
            Ok(transition) => stock_ok(&transition.item),
            Err(err) => stock_err(&req.sku, &location, &err),
        };
        Ok(Response::new(response))
    }

    async fn check_availability(
        &self,
        request: Request<CheckAvailabilityRequest>,
    ) -> Result<Response<AvailabilityResponse>, Status> {
        let req = request.into_inner();
        Ok(Response::new(availability(&self.state, &req).await))
    }

    async fn bulk_check_availability(
        &self,
        request: Request<BulkCheckAvailabilityRequest>,
    ) -> Result<Response<BulkCheckAvailabilityResponse>, Status> {
        let req = request.into_inner();
        let mut results = Vec::with_capacity(req.items.len());
        for item in &req.items {
            results.push(availability(&self.state, item).await);
        }
        Ok(Response::new(BulkCheckAvailabilityResponse { results }))
    }
}

async fn availability(state: &AppState, req: &CheckAvailabilityRequest) -> AvailabilityResponse {
    let location = non_empty(req.location.clone());
    match query::check_availability(&state.db, &req.sku, req.quantity, location.as_deref()).await {
        Ok(report) => AvailabilityResponse {
            success: true,
            error: String::new(),
            sku: report.sku,
            total_available: report.total_available,
            is_available: report.is_available,
            backorderable: report.backorderable,
            locations: report
                .per_location
                .into_iter()
                .map(|loc| LocationAvailability {
                    location: loc.location,
                    quantity_on_hand: loc.quantity_on_hand,
                    quantity_reserved: loc.quantity_reserved,
                    quantity_available: loc.quantity_available,
                    backorderable: loc.backorderable,
                })
                .collect(),
        },
        Err(err) => {
            let err = EngineError::Database(err);
            warn!(sku = %req.sku, error = %err, "availability rpc failed");
            AvailabilityResponse {
                success: false,
                error: err.rpc_error(),
                sku: req.sku.clone(),
                ..Default::default()
            }
        }
    }
}
