// [libs/infra/db-turso/src/client.rs]
/*!
 * =================================================================
 * APARATO: TACTICAL LEDGER LINK (V6.0 - TARGET TAXONOMY)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CLASIFICACIÓN DEL DESTINO Y APERTURA DEL ENLACE ACID
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TARGET TAXONOMY: El destino de persistencia se clasifica en un
 *    tipo suma (cluster remoto / sustrato local / RAM efímera) ANTES
 *    de tocar el driver; cada variante declara sus propias exigencias
 *    de credenciales en el tipo, no en guardias dispersas.
 * 2. SINGLE GENESIS PATH: El esquema se solidifica sobre una conexión
 *    génesis única para TODA variante; en RAM esa misma conexión queda
 *    retenida como ancla del segmento compartido.
 * 3. CRASH-ONLY LINK: Un destino malformado o un bootstrap fallido
 *    niegan la construcción del cliente; jamás se entrega un enlace a
 *    un Ledger a medio solidificar.
 * =================================================================
 */

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{info, instrument, warn};

use crate::errors::DbError;
use crate::schema::apply_dispatch_schema;

/// Taxonomía del destino de persistencia del Ledger.
enum LinkTarget {
    /// Cluster Turso remoto; el token de acceso es obligatorio.
    RemoteCluster {
        /// URL libsql:// o https:// del cluster.
        url: String,
        /// Credencial de acceso exigida por la variante.
        access_token: String,
    },
    /// Archivo local o segmento de RAM (desarrollo y Proving Grounds).
    LocalSubstrate {
        /// Ruta o URL local del sustrato.
        url: String,
        /// RAM efímera: el segmento muere con su última conexión.
        is_ephemeral: bool,
    },
}

/// Clasifica el destino declarado y valida sus exigencias de credencial.
fn classify_link_target(
    database_connection_url: &str,
    database_access_token: Option<String>,
) -> Result<LinkTarget, DbError> {
    if database_connection_url.is_empty() {
        return Err(DbError::ConfigurationError("DATABASE_URL_EMPTY".into()));
    }

    let is_remote_scheme = database_connection_url.starts_with("libsql://")
        || database_connection_url.starts_with("https://");

    if is_remote_scheme {
        let access_token = database_access_token.ok_or_else(|| {
            DbError::ConfigurationError("REMOTE_CLUSTER_TOKEN_ABSENT".into())
        })?;
        return Ok(LinkTarget::RemoteCluster {
            url: database_connection_url.to_string(),
            access_token,
        });
    }

    Ok(LinkTarget::LocalSubstrate {
        url: database_connection_url.to_string(),
        is_ephemeral: database_connection_url.contains(":memory:")
            || database_connection_url.contains("mode=memory"),
    })
}

/// Cliente táctico del Ledger (Turso Cloud / archivo local / RAM).
#[derive(Clone)]
pub struct TursoClient {
    shared_database_driver: Arc<Database>,
    /// Conexión génesis retenida SOLO para sustratos de RAM: soltarla
    /// permitiría a SQLite purgar el segmento con el esquema dentro.
    _ephemeral_anchor: Option<Arc<Connection>>,
}

impl TursoClient {
    /**
     * Clasifica el destino, abre el driver y solidifica el esquema
     * sobre la conexión génesis antes de entregar el cliente.
     *
     * # Errors:
     * - `DbError::ConfigurationError`: destino vacío o token ausente
     *   para un cluster remoto.
     * - `DbError::ConnectionError`: el driver rechazó el enlace o el
     *   bootstrap del esquema colapsó.
     */
    #[instrument(skip(database_access_token))]
    pub async fn connect(
        database_connection_url: &str,
        database_access_token: Option<String>,
    ) -> Result<Self, DbError> {
        let link_target =
            classify_link_target(database_connection_url, database_access_token)?;

        let (database_driver, retain_genesis_as_anchor) = match link_target {
            LinkTarget::RemoteCluster { url, access_token } => {
                info!("🔌 [DATABASE]: Opening remote cluster link to [{}].", url);
                let driver = Builder::new_remote(url, access_token)
                    .build()
                    .await
                    .map_err(|fault| {
                        DbError::ConnectionError(format!("REMOTE_LINK_REFUSED: {}", fault))
                    })?;
                (driver, false)
            }
            LinkTarget::LocalSubstrate { url, is_ephemeral } => {
                if is_ephemeral {
                    info!("🔌 [DATABASE]: Carving ephemeral RAM substrate [{}].", url);
                } else {
                    info!("🔌 [DATABASE]: Opening local substrate [{}].", url);
                }
                let driver = Builder::new_local(url).build().await.map_err(|fault| {
                    DbError::ConnectionError(format!("LOCAL_SUBSTRATE_REFUSED: {}", fault))
                })?;
                (driver, is_ephemeral)
            }
        };

        let shared_database_driver = Arc::new(database_driver);

        // Conexión génesis: la PRIMERA del driver y la única vía de
        // solidificación del esquema, sea cual sea la variante.
        let genesis_connection = shared_database_driver.connect().map_err(|fault| {
            DbError::ConnectionError(format!("GENESIS_LINK_REFUSED: {}", fault))
        })?;
        apply_dispatch_schema(&genesis_connection)
            .await
            .map_err(|fault| {
                DbError::ConnectionError(format!("SCHEMA_BOOTSTRAP_COLLAPSED: {}", fault))
            })?;

        let ephemeral_anchor = if retain_genesis_as_anchor {
            info!("⚓ [DATABASE]: Genesis connection retained as RAM anchor.");
            Some(Arc::new(genesis_connection))
        } else {
            None
        };

        Ok(Self {
            shared_database_driver,
            _ephemeral_anchor: ephemeral_anchor,
        })
    }

    /// Asigna una conexión del driver compartido.
    pub fn get_connection(&self) -> Result<Connection, DbError> {
        self.shared_database_driver.connect().map_err(|fault| {
            warn!("⚠️ [POOL_FAULT]: Connection allocation refused: {}", fault);
            DbError::ConnectionError(fault.to_string())
        })
    }
}
