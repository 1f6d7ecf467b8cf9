//! Umbrella crate for the campus lost & found service.
//!
//! [`LostFound`] wires the item store, matching engine, claim desk and AI
//! collaborators from one [`LostFoundConfig`], so the HTTP server and tests
//! share a single construction path.

pub mod config;

pub use config::{
    AI_API_KEY_ENV, AuthYamlConfig, ClaimsYamlConfig, ConfigLoadError, LostFoundConfig,
    StoreBackendKind, StoreCompression, StoreYamlConfig, TOKEN_SECRET_ENV,
};

pub use assist::{
    ANALYSIS_FALLBACK_NOTICE, AssistConfig, AssistError, AutofillDraft, ClaimAssessment,
    ClaimComparator, Collaborators, ImageAnalyzer, ItemAnalysis, Provider, StubAssistant,
};
pub use claims::{
    ClaimDesk, ClaimError, ClaimStep, ClaimView, ClaimsConfig, MIN_PROOF_CHARS, PickupCredential,
    VERIFICATION_THRESHOLD,
};
pub use items::{
    Category, EmailDomainPolicy, EmbeddedImage, FoundReport, ItemDraft, ItemError, ItemRecord,
    ItemStatus, ItemType, LostReport, Principal, PublicItem,
};
pub use matcher::{
    LostQuery, MAX_CLIENT_SEQ, MatchConfig, MatchError, MatchOutcome, Matcher, QueryGuard,
};
pub use store::{FeedSubscription, ItemQuery, ItemStore, SortOrder, StoreError};

use std::sync::Arc;

use thiserror::Error;

/// Failures while assembling or driving the service.
#[derive(Debug, Error)]
pub enum LostFoundError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Assist(#[from] AssistError),
}

/// The assembled service.
pub struct LostFound {
    config: LostFoundConfig,
    policy: EmailDomainPolicy,
    store: Arc<ItemStore>,
    matcher: Arc<Matcher>,
    claims: Arc<ClaimDesk>,
    collaborators: Collaborators,
}

impl LostFound {
    /// Build every component, including the AI collaborators named by
    /// `config.assist`.
    pub fn from_config(config: LostFoundConfig) -> Result<Self, LostFoundError> {
        config.validate()?;
        let collaborators = config.assist.build()?;
        Self::with_collaborators(config, collaborators)
    }

    /// Build with caller-supplied collaborators, ignoring `config.assist`.
    pub fn with_collaborators(
        config: LostFoundConfig,
        collaborators: Collaborators,
    ) -> Result<Self, LostFoundError> {
        config.validate()?;
        let store = Arc::new(ItemStore::open(config.store_config())?);
        let matcher = Arc::new(Matcher::with_config(
            Arc::clone(&store),
            config.matcher.clone(),
        )?);
        let claims = Arc::new(ClaimDesk::new(
            Arc::clone(&store),
            Arc::clone(&collaborators.comparator),
            config.claims_config(),
        ));
        let policy = config.domain_policy();

        tracing::info!(
            target: "lostfound",
            backend = ?config.store.backend,
            provider = ?config.assist.provider,
            allowed_domain = policy.suffix(),
            "lost & found service assembled"
        );

        Ok(Self {
            config,
            policy,
            store,
            matcher,
            claims,
            collaborators,
        })
    }

    /// In-memory store with the offline stub collaborator.
    pub fn in_memory() -> Result<Self, LostFoundError> {
        Self::from_config(LostFoundConfig::default())
    }

    pub fn config(&self) -> &LostFoundConfig {
        &self.config
    }

    pub fn policy(&self) -> &EmailDomainPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    pub fn matcher(&self) -> &Arc<Matcher> {
        &self.matcher
    }

    pub fn claims(&self) -> &Arc<ClaimDesk> {
        &self.claims
    }

    pub fn analyzer(&self) -> &Arc<dyn ImageAnalyzer> {
        &self.collaborators.analyzer
    }

    pub fn comparator(&self) -> &Arc<dyn ClaimComparator> {
        &self.collaborators.comparator
    }

    /// Decode an uploaded photo under the configured size limit.
    pub fn decode_image(&self, mime: Option<&str>, data: &str) -> Result<EmbeddedImage, ItemError> {
        EmbeddedImage::from_base64(mime, data, self.config.store.max_image_bytes)
    }

    /// Store a report on behalf of `principal`.
    pub fn report(
        &self,
        draft: ItemDraft,
        principal: &Principal,
    ) -> Result<PublicItem, LostFoundError> {
        self.policy.check(&principal.email)?;
        let record = self.store.insert(draft, principal)?;
        tracing::info!(
            target: "lostfound",
            item_id = %record.id,
            item_type = %record.item_type,
            category = %record.category,
            "item reported"
        );
        Ok(PublicItem::from(record))
    }

    pub fn find_candidates(&self, query: &LostQuery) -> MatchOutcome {
        self.matcher.find_candidates(query)
    }

    /// Prefill a found report from its photo. Never fails: analysis errors
    /// come back as an empty draft with a notice.
    pub async fn draft_found_report(&self, image: &EmbeddedImage) -> AutofillDraft {
        let result = self
            .collaborators
            .analyzer
            .analyze(image.base64(), image.mime())
            .await;
        AutofillDraft::from_result(result)
    }
}

impl std::fmt::Debug for LostFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LostFound")
            .field("backend", &self.config.store.backend)
            .field("provider", &self.config.assist.provider)
            .field("open_claims", &self.claims.open_claims())
            .finish_non_exhaustive()
    }
}
