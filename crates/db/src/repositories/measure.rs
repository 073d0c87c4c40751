use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use slideboard_core::domain::measure::{
    InstallType, MeasureItem, MeasureItemId, MeasureSheet, MeasureSheetId, MeasureTaskId,
};
use slideboard_core::domain::quote::TenantId;

use super::{
    column, decimal_column, optional_decimal_column, timestamp, timestamp_column,
    MeasureRepository, RepositoryError,
};
use crate::DbPool;

const SHEET_COLUMNS: &str = "id, tenant_id, task_id, round, variant, created_at";

pub struct SqlMeasureRepository {
    pool: DbPool,
}

impl SqlMeasureRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MeasureRepository for SqlMeasureRepository {
    async fn latest_sheet_for_task(
        &self,
        tenant_id: &TenantId,
        task_id: &MeasureTaskId,
    ) -> Result<Option<MeasureSheet>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_latest_sheet(&mut conn, tenant_id, task_id).await
    }

    async fn find_sheet(
        &self,
        tenant_id: &TenantId,
        id: &MeasureSheetId,
    ) -> Result<Option<MeasureSheet>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_sheet(&mut conn, tenant_id, id).await
    }

    async fn save_sheet(&self, sheet: &MeasureSheet) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO measure_task (id, tenant_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&sheet.task_id.0)
        .bind(&sheet.tenant_id.0)
        .bind(timestamp(sheet.created_at))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO measure_sheet ({SHEET_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(&sheet.id.0)
        .bind(&sheet.tenant_id.0)
        .bind(&sheet.task_id.0)
        .bind(sheet.round)
        .bind(&sheet.variant)
        .bind(timestamp(sheet.created_at))
        .execute(&mut *tx)
        .await?;

        for (position, item) in sheet.items.iter().enumerate() {
            let sort_order = i64::try_from(position)
                .map_err(|_| RepositoryError::Decode("measure item position overflow".into()))?;
            sqlx::query(
                "INSERT INTO measure_item (id, tenant_id, sheet_id, room_name, window_type, width,
                                           height, install_type, bracket_dist, wall_material,
                                           has_box, box_depth, is_electric, remark, sort_order)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&item.id.0)
            .bind(&sheet.tenant_id.0)
            .bind(&sheet.id.0)
            .bind(&item.room_name)
            .bind(&item.window_type)
            .bind(item.width.to_string())
            .bind(item.height.to_string())
            .bind(item.install_type.map(|value| value.as_str()))
            .bind(item.bracket_dist.map(|value| value.to_string()))
            .bind(&item.wall_material)
            .bind(item.has_box)
            .bind(item.box_depth.map(|value| value.to_string()))
            .bind(item.is_electric)
            .bind(&item.remark)
            .bind(sort_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn row_to_measure_item(row: &SqliteRow) -> Result<MeasureItem, RepositoryError> {
    let install_type: Option<String> = column(row, "install_type")?;
    let install_type = match install_type {
        Some(raw) => Some(InstallType::parse(&raw).ok_or_else(|| {
            RepositoryError::Decode(format!("install_type: unknown value `{raw}`"))
        })?),
        None => None,
    };

    Ok(MeasureItem {
        id: MeasureItemId(column(row, "id")?),
        room_name: column(row, "room_name")?,
        window_type: column(row, "window_type")?,
        width: decimal_column(row, "width")?,
        height: decimal_column(row, "height")?,
        install_type,
        bracket_dist: optional_decimal_column(row, "bracket_dist")?,
        wall_material: column(row, "wall_material")?,
        has_box: column(row, "has_box")?,
        box_depth: optional_decimal_column(row, "box_depth")?,
        is_electric: column(row, "is_electric")?,
        remark: column(row, "remark")?,
    })
}

async fn load_sheet(
    conn: &mut SqliteConnection,
    row: Option<SqliteRow>,
) -> Result<Option<MeasureSheet>, RepositoryError> {
    let Some(row) = row else {
        return Ok(None);
    };

    let id = MeasureSheetId(column(&row, "id")?);
    let tenant_id = TenantId(column(&row, "tenant_id")?);
    let items = sqlx::query(
        "SELECT id, room_name, window_type, width, height, install_type, bracket_dist,
                wall_material, has_box, box_depth, is_electric, remark
         FROM measure_item
         WHERE tenant_id = ? AND sheet_id = ?
         ORDER BY sort_order ASC, id ASC",
    )
    .bind(&tenant_id.0)
    .bind(&id.0)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(row_to_measure_item)
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(MeasureSheet {
        id,
        tenant_id,
        task_id: MeasureTaskId(column(&row, "task_id")?),
        round: column(&row, "round")?,
        variant: column(&row, "variant")?,
        created_at: timestamp_column(&row, "created_at")?,
        items,
    }))
}

/// Most recently created sheet of a task; ties go to the higher round.
pub async fn fetch_latest_sheet(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    task_id: &MeasureTaskId,
) -> Result<Option<MeasureSheet>, RepositoryError> {
    let row = sqlx::query(&format!(
        "SELECT {SHEET_COLUMNS} FROM measure_sheet
         WHERE tenant_id = ? AND task_id = ?
         ORDER BY created_at DESC, round DESC, id DESC
         LIMIT 1"
    ))
    .bind(&tenant_id.0)
    .bind(&task_id.0)
    .fetch_optional(&mut *conn)
    .await?;

    load_sheet(conn, row).await
}

pub async fn fetch_sheet(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    id: &MeasureSheetId,
) -> Result<Option<MeasureSheet>, RepositoryError> {
    let row = sqlx::query(&format!(
        "SELECT {SHEET_COLUMNS} FROM measure_sheet WHERE tenant_id = ? AND id = ?"
    ))
    .bind(&tenant_id.0)
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    load_sheet(conn, row).await
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use slideboard_core::domain::measure::{
        InstallType, MeasureItem, MeasureItemId, MeasureSheet, MeasureSheetId, MeasureTaskId,
    };
    use slideboard_core::domain::quote::TenantId;

    use super::SqlMeasureRepository;
    use crate::repositories::MeasureRepository;
    use crate::{connect_with_settings, migrations};

    fn sheet(id: &str, tenant: &TenantId, age: Duration, widths: &[i64]) -> MeasureSheet {
        MeasureSheet {
            id: MeasureSheetId(id.to_string()),
            tenant_id: tenant.clone(),
            task_id: MeasureTaskId("MT-1".to_string()),
            round: 1,
            variant: "A".to_string(),
            created_at: Utc::now() - age,
            items: widths
                .iter()
                .enumerate()
                .map(|(index, width)| MeasureItem {
                    id: MeasureItemId(format!("{id}-M{index}")),
                    room_name: "Bedroom".to_string(),
                    window_type: "STRAIGHT".to_string(),
                    width: Decimal::from(*width),
                    height: Decimal::new(26005, 1),
                    install_type: Some(InstallType::Top),
                    bracket_dist: None,
                    wall_material: Some("concrete".to_string()),
                    has_box: index % 2 == 0,
                    box_depth: Some(Decimal::from(120)),
                    is_electric: false,
                    remark: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn latest_sheet_wins_and_items_keep_input_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlMeasureRepository::new(pool);
        let tenant = TenantId("T-1".to_string());

        repo.save_sheet(&sheet("S-old", &tenant, Duration::days(2), &[1000]))
            .await
            .expect("save old");
        repo.save_sheet(&sheet("S-new", &tenant, Duration::hours(1), &[3000, 1200, 2400]))
            .await
            .expect("save new");

        let latest = repo
            .latest_sheet_for_task(&tenant, &MeasureTaskId("MT-1".to_string()))
            .await
            .expect("latest")
            .expect("sheet exists");
        assert_eq!(latest.id.0, "S-new");
        let widths: Vec<String> = latest.items.iter().map(|item| item.width.to_string()).collect();
        assert_eq!(widths, vec!["3000", "1200", "2400"]);
        assert_eq!(latest.items[0].install_type, Some(InstallType::Top));
        assert!(latest.items[0].has_box);

        let old = repo
            .find_sheet(&tenant, &MeasureSheetId("S-old".to_string()))
            .await
            .expect("find")
            .expect("old sheet");
        assert_eq!(old.items.len(), 1);

        let other = TenantId("T-2".to_string());
        assert!(repo
            .latest_sheet_for_task(&other, &MeasureTaskId("MT-1".to_string()))
            .await
            .expect("latest")
            .is_none());
    }
}
