//! [`FeedService`]: fan-out, reconcile, compose, cache.

use std::time::Duration;

use chrono::Utc;
use portal_core::{
  academics::AcademicsFeed,
  auth_state::{AuthenticationState, AuthorityTarget, SessionRecord},
  delegation::DelegateStudentView,
  feed::{FeedInputs, UserFeed, compose, compose_academics},
  flags::FeatureFlags,
  identity::Uid,
  reconcile::{ReconcileContext, SourceAnswers, reconcile},
  source::{
    AttributeSource, CacheGate, CampusSystems, Lookup, UserAuth, UserData,
    UserDataStore,
  },
};

use crate::{
  Error, Result,
  cache::{get_or_compute, get_or_compute_with_ttl, keys},
  context::RequestContext,
  fanout::bounded,
  last_modified::{content_hash, stamp},
  privileges::DelegationPrivilegeResolver,
  validator::AuthenticationValidator,
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
  pub flags:              FeatureFlags,
  /// Bound on every individual upstream call.
  pub upstream_timeout:   Duration,
  pub cache_ttl:          Duration,
  /// Lifetime of a feed composed while some upstream was failing.
  pub failure_ttl:        Duration,
  /// How long a held-applicant decision is remembered.
  pub held_applicant_ttl: Duration,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      flags:              FeatureFlags::default(),
      upstream_timeout:   Duration::from_secs(5),
      cache_ttl:          Duration::from_secs(8 * 60 * 60),
      failure_ttl:        Duration::from_secs(60),
      held_applicant_ttl: Duration::from_secs(60),
    }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct FeedService<C, S, G> {
  systems: C,
  store:   S,
  cache:   G,
  config:  FeedConfig,
}

fn store_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::Store(Box::new(e))
}

/// Cache discriminator for the viewing context of a request.
fn view_key(auth: &AuthenticationState) -> String {
  let mode: &'static str = auth.view_mode().into();
  match auth.real_user_id() {
    Some(real) => format!("{mode}:{real}"),
    None => mode.to_owned(),
  }
}

impl<C, S, G> FeedService<C, S, G>
where
  C: CampusSystems,
  S: UserDataStore,
  G: CacheGate,
{
  pub fn new(systems: C, store: S, cache: G, config: FeedConfig) -> Self {
    Self {
      systems,
      store,
      cache,
      config,
    }
  }

  pub fn config(&self) -> &FeedConfig { &self.config }

  pub fn cache(&self) -> &G { &self.cache }

  fn resolver(&self) -> DelegationPrivilegeResolver<'_, C> {
    DelegationPrivilegeResolver::new(
      &self.systems,
      self.config.upstream_timeout,
      self.config.flags.cs_delegated_access,
    )
  }

  fn validator(&self) -> AuthenticationValidator<'_, C, G> {
    AuthenticationValidator {
      systems:  &self.systems,
      cache:    &self.cache,
      enabled:  self.config.flags.authentication_validator,
      timeout:  self.config.upstream_timeout,
      ttl:      self.config.cache_ttl,
      held_ttl: self.config.held_applicant_ttl,
    }
  }

  /// Build the context for one request. A directly authenticated held
  /// applicant comes back with no user id.
  pub async fn authenticate(&self, session: &SessionRecord) -> RequestContext {
    let mut auth = AuthenticationState::from_session(session);
    if auth.directly_authenticated()
      && let Some(uid) = auth.user_id.take()
    {
      auth.user_id = self.validator().validated_uid(&uid).await;
    }
    tracing::debug!(%auth, "request authenticated");
    RequestContext::new(auth)
  }

  fn subject<'c>(&self, ctx: &'c RequestContext) -> Result<&'c Uid> {
    ctx.auth().user_id.as_ref().ok_or(Error::Unauthenticated)
  }

  /// The subject of a write. View-as sessions are read-only.
  fn writer<'c>(&self, ctx: &'c RequestContext) -> Result<&'c Uid> {
    let uid = self.subject(ctx)?;
    if !ctx.auth().directly_authenticated() {
      return Err(Error::Forbidden("view-as sessions cannot modify user data"));
    }
    Ok(uid)
  }

  /// Authority record of the real user; public when unknown.
  async fn actor_auth(&self, auth: &AuthenticationState) -> UserAuth {
    self.actor_lookup(auth).await.into_found().unwrap_or_default()
  }

  async fn actor_lookup(&self, auth: &AuthenticationState) -> Lookup<UserAuth> {
    match auth.real_user_auth() {
      Some(AuthorityTarget::User(uid)) => {
        bounded("user_auth", &uid, self.config.upstream_timeout, self.systems.user_auth(&uid)).await
      }
      Some(AuthorityTarget::Public) | None => Lookup::Found(UserAuth::public()),
    }
  }

  // ── Feed ─────────────────────────────────────────────────────────────────

  /// The status feed of the request's subject, stamped with its
  /// last-modified record. A feed composed around a failing upstream is
  /// cached for `failure_ttl` only.
  pub async fn get_feed(&self, ctx: &RequestContext) -> Result<UserFeed> {
    let uid = self.subject(ctx)?;
    let view = view_key(ctx.auth());

    let mut feed = get_or_compute_with_ttl(&self.cache, &keys::status(uid, &view), || async {
      let (feed, degraded) = self.compose_feed(ctx, uid).await;
      let ttl = if degraded {
        tracing::info!(%uid, view = %view, "caching degraded feed briefly");
        self.config.failure_ttl
      } else {
        self.config.cache_ttl
      };
      Ok::<_, Error>((feed, ttl))
    })
    .await?;

    let hash = content_hash(&feed)?;
    feed.last_modified = Some(stamp(&self.cache, &keys::last_modified(uid, &view), hash).await);
    Ok(feed)
  }

  /// The composed feed, and whether any upstream failed while composing it.
  async fn compose_feed(&self, ctx: &RequestContext, uid: &Uid) -> (UserFeed, bool) {
    let auth = ctx.auth();
    let flags = self.config.flags;
    let limit = self.config.upstream_timeout;
    let systems = &self.systems;
    let resolver = self.resolver();

    let legacy = bounded(systems.legacy().name(), uid, limit, systems.legacy().fetch(uid));
    let modern = async {
      if flags.cs_profile {
        bounded(systems.modern().name(), uid, limit, systems.modern().fetch(uid)).await
      } else {
        Lookup::NotFound
      }
    };
    let delegate_students = async {
      if flags.cs_delegated_access && auth.directly_authenticated() {
        bounded("delegate_students", uid, limit, systems.delegate_students(uid)).await
      } else {
        Lookup::NotFound
      }
    };
    let user_data = async {
      self.store.get_user_data(uid).await.map_err(|e| {
        tracing::error!(%uid, error = %e, "user data unavailable");
      })
    };

    let (
      legacy,
      modern,
      crosswalk,
      user_data,
      actor,
      history,
      accounts,
      delegate_students,
      privileges,
    ) = tokio::join!(
      legacy,
      modern,
      bounded("crosswalk", uid, limit, systems.correlated_ids(uid)),
      user_data,
      self.actor_lookup(auth),
      bounded("course_history", uid, limit, systems.course_history(uid)),
      bounded("linked_accounts", uid, limit, systems.linked_accounts(uid)),
      delegate_students,
      ctx.delegated_resolution(&resolver),
    );

    let degraded = legacy.is_errored()
      || modern.is_errored()
      || crosswalk.is_errored()
      || user_data.is_err()
      || actor.is_errored()
      || history.is_errored()
      || accounts.is_errored()
      || delegate_students.is_errored()
      || privileges.is_some_and(|r| r.degraded);
    let user_data = user_data.ok().flatten();
    let actor = actor.into_found().unwrap_or_default();
    let privileges = privileges.map(|r| r.privileges);

    let answers = SourceAnswers {
      legacy,
      modern,
      crosswalk,
    };
    let profile = reconcile(
      uid,
      &answers,
      user_data.as_ref(),
      &ReconcileContext::new(flags, auth),
    );
    let delegate_students = delegate_students.into_found().unwrap_or_default();
    let history = history.into_found().unwrap_or_default();
    let accounts = accounts.into_found().unwrap_or_default();

    let feed = compose(FeedInputs {
      profile: &profile,
      auth,
      actor: &actor,
      privileges: privileges.as_ref(),
      delegate_students: &delegate_students,
      history: &history,
      accounts: &accounts,
      user_data: user_data.as_ref(),
    });
    (feed, degraded)
  }

  // ── Academics ────────────────────────────────────────────────────────────

  /// The academics feed, filtered for a delegate viewer.
  pub async fn academics(&self, ctx: &RequestContext) -> Result<AcademicsFeed> {
    const REFUSED: &str = "delegate holds neither enrollment nor grade privileges";

    let uid = self.subject(ctx)?;
    let privileges = ctx.delegated_privileges(&self.resolver()).await;
    if privileges.is_some_and(|p| !p.grants_academics()) {
      return Err(Error::Forbidden(REFUSED));
    }

    let limit = self.config.upstream_timeout;
    let feed = get_or_compute(
      &self.cache,
      &keys::academics(uid),
      self.config.cache_ttl,
      || async {
        match bounded("academics", uid, limit, self.systems.academics(uid)).await {
          Lookup::Found(feed) => Ok(feed),
          Lookup::NotFound => Ok(AcademicsFeed::default()),
          Lookup::Errored(details) => Err(details),
        }
      },
    )
    .await
    .unwrap_or_default();

    compose_academics(feed, privileges.as_ref()).ok_or(Error::Forbidden(REFUSED))
  }

  // ── Delegates ────────────────────────────────────────────────────────────

  /// Students linked to the signed-in delegate.
  pub async fn delegate_students(&self, ctx: &RequestContext) -> Result<Vec<DelegateStudentView>> {
    let uid = self.subject(ctx)?;
    if !ctx.auth().directly_authenticated() {
      return Err(Error::Forbidden("delegate students are listed only to the delegate"));
    }
    if !self.config.flags.cs_delegated_access {
      return Ok(Vec::new());
    }
    let students = bounded(
      "delegate_students",
      uid,
      self.config.upstream_timeout,
      self.systems.delegate_students(uid),
    )
    .await
    .into_found()
    .unwrap_or_default();
    Ok(students.into_iter().map(DelegateStudentView::from).collect())
  }

  // ── User data ────────────────────────────────────────────────────────────

  /// Set the preferred-name override. Surrounding whitespace is trimmed; a
  /// blank value clears the override.
  pub async fn update_preferred_name(&self, ctx: &RequestContext, value: &str) -> Result<UserData> {
    let uid = self.writer(ctx)?;
    let trimmed = value.trim();
    let preferred_name = (!trimmed.is_empty()).then(|| trimmed.to_owned());

    let data = self
      .store
      .set_preferred_name(uid, preferred_name)
      .await
      .map_err(store_error)?;
    self.cache.invalidate(&keys::user(uid)).await;
    Ok(data)
  }

  pub async fn record_first_login(&self, ctx: &RequestContext) -> Result<UserData> {
    let uid = self.writer(ctx)?;
    let data = self
      .store
      .record_first_login(uid, Utc::now())
      .await
      .map_err(store_error)?;
    self.cache.invalidate(&keys::user(uid)).await;
    Ok(data)
  }

  /// Remove everything stored for `target`. Requires administrator
  /// authority of the real user.
  pub async fn delete_user(&self, ctx: &RequestContext, target: &Uid) -> Result<bool> {
    self.subject(ctx)?;
    if !self.actor_auth(ctx.auth()).await.can_administrate() {
      return Err(Error::Forbidden("administrator authority required"));
    }

    let actor = ctx.auth().real_user_id().unwrap_or_default();
    tracing::warn!(%target, %actor, "removing all stored user data");
    let deleted = self
      .store
      .delete_user_data(target)
      .await
      .map_err(store_error)?;
    self.cache.invalidate(&keys::user(target)).await;
    self.cache.invalidate(&keys::last_modified_root(target)).await;
    Ok(deleted)
  }
}
