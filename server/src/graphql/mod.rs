mod types;

use anyhow::anyhow;
use async_graphql::{Context, EmptySubscription, ErrorExtensions, ID, Object, Schema};
use chrono::{Datelike, Utc};
use entity::User;
use platform_api::{ApiError, internal_error};
use platform_store::StoreError;
use products_deals::{
    DealDraft, DealRoom, DealRoomError, DocumentUpload, parse_price,
};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

pub use types::*;

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Signed-in user for the current request, attached by the HTTP layer.
#[derive(Clone, Debug, Default)]
pub struct Viewer(pub Option<User>);

pub fn build_schema(room: DealRoom) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(room)
        .finish()
}

type GqlResult<T> = async_graphql::Result<T>;

fn api_error(err: DealRoomError) -> ApiError {
    match err {
        DealRoomError::Negotiation(err) => ApiError::rejected(err.code(), err.to_string()),
        DealRoomError::DealNotFound(_)
        | DealRoomError::UnknownUser(_)
        | DealRoomError::NotificationNotFound(_) => ApiError::NotFound(err.to_string()),
        DealRoomError::Forbidden(message) => ApiError::rejected("FORBIDDEN", message),
        DealRoomError::Validation(message) => ApiError::InvalidInput(message),
        DealRoomError::Store(StoreError::Conflict { .. }) => ApiError::rejected(
            "CONFLICT",
            "The deal was changed by someone else, reload and try again",
        ),
        DealRoomError::Store(StoreError::NotFound { kind, .. }) => {
            ApiError::NotFound(format!("{kind} not found"))
        }
        DealRoomError::Store(err) => ApiError::internal(anyhow!(err)),
    }
}

fn gql<T>(result: Result<T, DealRoomError>) -> GqlResult<T> {
    result.map_err(|err| api_error(err).extend())
}

fn room<'ctx>(ctx: &Context<'ctx>) -> GqlResult<&'ctx DealRoom> {
    ctx.data::<DealRoom>()
        .map_err(|_| internal_error(anyhow!("deal room missing from schema data")))
}

fn viewer(ctx: &Context<'_>) -> GqlResult<User> {
    ctx.data_opt::<Viewer>()
        .and_then(|viewer| viewer.0.clone())
        .ok_or_else(|| ApiError::Unauthenticated.extend())
}

fn parse_uuid(id: &ID) -> GqlResult<Uuid> {
    Uuid::parse_str(id.as_str())
        .map_err(|_| ApiError::InvalidInput(format!("`{}` is not a valid id", id.as_str())).extend())
}

fn parse_amount(raw: &str) -> GqlResult<Decimal> {
    gql(parse_price(raw).map_err(DealRoomError::from))
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> GqlResult<HealthPayload> {
        Ok(HealthPayload { ok: true })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> GqlResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    #[instrument(name = "graphql.me", skip_all)]
    async fn me(&self, ctx: &Context<'_>) -> GqlResult<Option<UserNode>> {
        Ok(ctx
            .data_opt::<Viewer>()
            .and_then(|viewer| viewer.0.clone())
            .map(UserNode::from))
    }

    /// Deals the viewer takes part in, newest first.
    #[instrument(name = "graphql.deals", skip_all)]
    async fn deals(&self, ctx: &Context<'_>) -> GqlResult<Vec<DealNode>> {
        let user = viewer(ctx)?;
        let deals = gql(room(ctx)?.user_deals(user.id))?;
        Ok(deals.into_iter().map(DealNode::from).collect())
    }

    /// A deal the viewer takes part in; `null` when it does not exist.
    #[instrument(name = "graphql.deal", skip_all)]
    async fn deal(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<DealNode>> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let deal_id = parse_uuid(&id)?;
        Ok(gql(room.visible_deal(deal_id, user.id))?.map(DealNode::from))
    }

    #[graphql(name = "dealMessages")]
    #[instrument(name = "graphql.deal_messages", skip_all)]
    async fn deal_messages(&self, ctx: &Context<'_>, deal_id: ID) -> GqlResult<Vec<MessageNode>> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let messages = gql(room.deal_messages(parse_uuid(&deal_id)?, user.id))?;
        Ok(messages.into_iter().map(MessageNode::from).collect())
    }

    #[graphql(name = "dealDocuments")]
    #[instrument(name = "graphql.deal_documents", skip_all)]
    async fn deal_documents(
        &self,
        ctx: &Context<'_>,
        deal_id: ID,
    ) -> GqlResult<Vec<DocumentNode>> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let documents = gql(room.deal_documents(parse_uuid(&deal_id)?, user.id))?;
        Ok(documents.into_iter().map(DocumentNode::from).collect())
    }

    #[instrument(name = "graphql.notifications", skip_all)]
    async fn notifications(&self, ctx: &Context<'_>) -> GqlResult<Vec<NotificationNode>> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        Ok(room
            .notifications_for(user.id)
            .into_iter()
            .map(NotificationNode::from)
            .collect())
    }

    #[graphql(name = "unreadCount")]
    #[instrument(name = "graphql.unread_count", skip_all)]
    async fn unread_count(&self, ctx: &Context<'_>) -> GqlResult<usize> {
        let user = viewer(ctx)?;
        Ok(room(ctx)?.unread_count(user.id))
    }

    /// Dashboard counters. `year` defaults to the current year.
    #[instrument(name = "graphql.analytics", skip_all)]
    async fn analytics(&self, ctx: &Context<'_>, year: Option<i32>) -> GqlResult<AnalyticsNode> {
        viewer(ctx)?;
        let room = room(ctx)?;
        let year = year.unwrap_or_else(|| Utc::now().year());
        Ok(gql(room.summary(year))?.into())
    }

    #[graphql(name = "pricePreview")]
    #[instrument(name = "graphql.price_preview", skip_all)]
    async fn price_preview(
        &self,
        ctx: &Context<'_>,
        deal_id: ID,
        price: String,
    ) -> GqlResult<PricePreviewNode> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let price = parse_amount(&price)?;
        let change = gql(room.preview_price_change(parse_uuid(&deal_id)?, user.id, price))?;
        Ok(change.into())
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    #[graphql(name = "createDeal")]
    #[instrument(name = "graphql.create_deal", skip_all)]
    async fn create_deal(&self, ctx: &Context<'_>, input: CreateDealInput) -> GqlResult<DealNode> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let seller_id = input.seller_id.as_ref().map(parse_uuid).transpose()?;
        let draft = DealDraft {
            title: input.title,
            description: input.description,
            initial_price: parse_amount(&input.initial_price)?,
            seller_id,
        };
        Ok(gql(room.create_deal(draft, user.id))?.into())
    }

    #[graphql(name = "updateDealStatus")]
    #[instrument(name = "graphql.update_deal_status", skip_all, fields(deal_id = %deal_id.as_str()))]
    async fn update_deal_status(
        &self,
        ctx: &Context<'_>,
        deal_id: ID,
        status: DealStatusValue,
    ) -> GqlResult<DealNode> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let deal = gql(room.update_deal_status(parse_uuid(&deal_id)?, status.into(), user.id))?;
        Ok(deal.into())
    }

    #[graphql(name = "updateDealPrice")]
    #[instrument(name = "graphql.update_deal_price", skip_all, fields(deal_id = %deal_id.as_str()))]
    async fn update_deal_price(
        &self,
        ctx: &Context<'_>,
        deal_id: ID,
        price: String,
    ) -> GqlResult<DealNode> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let price = parse_amount(&price)?;
        let deal = gql(room.update_deal_price(parse_uuid(&deal_id)?, user.id, price))?;
        Ok(deal.into())
    }

    #[graphql(name = "sendMessage")]
    #[instrument(name = "graphql.send_message", skip_all)]
    async fn send_message(
        &self,
        ctx: &Context<'_>,
        deal_id: ID,
        content: String,
    ) -> GqlResult<MessageNode> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let message = gql(room.send_message(parse_uuid(&deal_id)?, user.id, &content))?;
        Ok(message.into())
    }

    #[graphql(name = "markMessagesRead")]
    #[instrument(name = "graphql.mark_messages_read", skip_all)]
    async fn mark_messages_read(&self, ctx: &Context<'_>, deal_id: ID) -> GqlResult<usize> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        gql(room.mark_messages_read(parse_uuid(&deal_id)?, user.id))
    }

    #[graphql(name = "uploadDocument")]
    #[instrument(name = "graphql.upload_document", skip_all)]
    async fn upload_document(
        &self,
        ctx: &Context<'_>,
        deal_id: ID,
        input: UploadDocumentInput,
    ) -> GqlResult<DocumentNode> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        let upload = DocumentUpload {
            name: input.name,
            content_type: input.content_type,
            size: input.size,
            share_with_counterparty: input.share_with_counterparty,
        };
        let document = gql(room.upload_document(parse_uuid(&deal_id)?, user.id, upload))?;
        Ok(document.into())
    }

    #[graphql(name = "markNotificationRead")]
    #[instrument(name = "graphql.mark_notification_read", skip_all)]
    async fn mark_notification_read(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> GqlResult<NotificationNode> {
        let user = viewer(ctx)?;
        let room = room(ctx)?;
        Ok(gql(room.mark_as_read(user.id, parse_uuid(&id)?))?.into())
    }

    #[graphql(name = "markAllNotificationsRead")]
    #[instrument(name = "graphql.mark_all_notifications_read", skip_all)]
    async fn mark_all_notifications_read(&self, ctx: &Context<'_>) -> GqlResult<usize> {
        let user = viewer(ctx)?;
        Ok(room(ctx)?.mark_all_as_read(user.id))
    }
}
