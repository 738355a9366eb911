use std::path::{Path, PathBuf};

use tracing::{Instrument, instrument};

use crate::{
    model::{
        apperror::{ApplicationError, ErrorType},
        config::{CorpusConfig, CuisineRoot},
        models::{DinerId, DinerInputType, DinerRecord, FileOutcome, FileReport, IngestionStats, MenuItemRecord},
    },
    service::{
        normalizers::{normalize_price, normalize_review_vector, normalize_shift, strip_emoji},
        repository::DinerRepository,
    },
};

/**
 * Walks the corpus and loads every diner record through the repository.
 *
 * Files are independent of each other. A file that cannot be parsed is skipped as a whole, a bad
 * shift or menu item only skips itself. Database errors stop the run.
 */
pub struct IngestionService<R: DinerRepository> {
    /**
     * Write boundary.
     */
    repository: R,
    /**
     * Whether emoji are removed from menu item details.
     */
    strip_emoji: bool,
}

impl<R: DinerRepository> IngestionService<R> {
    /**
     * Creates a new instance of `IngestionService`.
     *
     * # Arguments
     * `repository`: Where the diners are written.
     * `strip_emoji`: Whether emoji are removed from menu item details.
     *
     * # Returns
     * A new instance of `IngestionService`.
     */
    pub fn new(repository: R, strip_emoji: bool) -> Self {
        IngestionService { repository, strip_emoji }
    }

    /**
     * Gives back the repository, e.g. to close it.
     */
    pub fn into_repository(self) -> R {
        self.repository
    }

    /**
     * Loads all batches of all cuisine roots, in configuration order.
     *
     * # Arguments
     * `corpus`: The corpus configuration.
     *
     * # Returns
     * Counters over the whole corpus or the `ApplicationError` that stopped the run.
     */
    pub async fn load_corpus(&self, corpus: &CorpusConfig) -> Result<IngestionStats, ApplicationError> {
        let next_diner_id = self.repository.next_diner_id().await?;
        tracing::info!("Loading {} cuisine roots, first diner id will be {}", corpus.roots.len(), next_diner_id);
        let mut stats = IngestionStats::default();
        for root in &corpus.roots {
            let root_stats = self.load_in_range(root).await?;
            stats.merge(&root_stats);
        }
        tracing::info!(
            "Corpus loaded: {} files, {} diners, {} files skipped, {} missing batches",
            stats.files,
            stats.diners,
            stats.files_skipped,
            stats.batches_missing
        );
        Ok(stats)
    }

    /**
     * Loads the batches `first_batch..=last_batch` of one cuisine root.
     *
     * # Arguments
     * `root`: The cuisine root.
     *
     * # Returns
     * Counters for the root or the `ApplicationError` that stopped the run.
     */
    #[instrument(skip(self, root), fields(cuisine = %root.name))]
    pub async fn load_in_range(&self, root: &CuisineRoot) -> Result<IngestionStats, ApplicationError> {
        let span = tracing::Span::current();
        let mut stats = IngestionStats::default();
        for batch in root.first_batch..=root.last_batch {
            let batch_path = PathBuf::from(root.batch_path(batch));
            match self.load_batch(&batch_path).instrument(span.clone()).await {
                Ok(batch_stats) => stats.merge(&batch_stats),
                Err(err) if err.is_recoverable() => {
                    tracing::warn!("Skipping batch {}: {}", batch_path.display(), err);
                    stats.batches_missing += 1;
                }
                Err(err) => return Err(err),
            }
        }
        tracing::info!(
            "Cuisine {} loaded: {} files, {} diners, {} files skipped, {} shifts ({} skipped), {} menu items ({} skipped), {} diners without menu",
            root.name,
            stats.files,
            stats.diners,
            stats.files_skipped,
            stats.shifts_inserted,
            stats.shifts_skipped,
            stats.menu_items_inserted,
            stats.menu_items_skipped,
            stats.diners_without_menu
        );
        Ok(stats)
    }

    /**
     * Loads every file of one batch directory.
     *
     * # Arguments
     * `batch_path`: The batch directory.
     *
     * # Returns
     * Counters for the batch, an `ApplicationError` of type `Parse` if the directory cannot be listed, or the database error that stopped the run.
     */
    pub async fn load_batch(&self, batch_path: &Path) -> Result<IngestionStats, ApplicationError> {
        let files = list_files(batch_path).await?;
        tracing::debug!("Batch {} has {} files", batch_path.display(), files.len());
        let mut stats = IngestionStats::default();
        for file in files {
            let outcome = self.load_file(&file).await?;
            stats.record(&outcome);
        }
        Ok(stats)
    }

    /**
     * Loads one diner file. Only database errors are returned, every other failure skips the file.
     *
     * # Arguments
     * `path`: The diner file.
     *
     * # Returns
     * What happened to the file or the database error that stopped the run.
     */
    pub async fn load_file(&self, path: &Path) -> Result<FileOutcome, ApplicationError> {
        match self.ingest_file(path).await {
            Ok(report) => Ok(FileOutcome::Done(report)),
            Err(err) if err.is_recoverable() => {
                tracing::warn!("Skipping file {}: {}", path.display(), err);
                Ok(FileOutcome::Skipped)
            }
            Err(err) => {
                tracing::error!("Aborting at file {}: {}", path.display(), err);
                Err(err)
            }
        }
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn ingest_file(&self, path: &Path) -> Result<FileReport, ApplicationError> {
        let record = read_record(path).await?;
        let diner = prepare_diner(&record)?;
        let diner_id = self.repository.insert_diner(&diner).await?;
        let mut report = FileReport { diner_id, ..FileReport::default() };

        for shift in record.shifts() {
            match self.insert_shift(diner_id, shift).await {
                Ok(()) => report.shifts_inserted += 1,
                Err(err) if err.is_recoverable() => {
                    tracing::warn!("Skipping shift of {}: {}", path.display(), err);
                    report.shifts_skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        match menu_items(&record) {
            Ok(items) => {
                for item in items {
                    match self.insert_menu_item(diner_id, item).await {
                        Ok(()) => report.menu_items_inserted += 1,
                        Err(err) if err.is_recoverable() => {
                            tracing::warn!("Skipping menu item {} of {}: {}", item.name, path.display(), err);
                            report.menu_items_skipped += 1;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
            Err(err) if err.error_type == ErrorType::MissingMenu => {
                tracing::info!("{}: {}", path.display(), err);
                report.missing_menu = true;
            }
            Err(err) => return Err(err),
        }
        Ok(report)
    }

    async fn insert_shift(&self, diner_id: DinerId, shift: &serde_json::Value) -> Result<(), ApplicationError> {
        let shift = shift.as_str().ok_or_else(|| ApplicationError::new(ErrorType::MalformedShift, format!("Shift {shift} is not text")))?;
        let (start, end) = normalize_shift(shift)?;
        self.repository.insert_timetable_entry(diner_id, start, end).await
    }

    async fn insert_menu_item(&self, diner_id: DinerId, item: &MenuItemRecord) -> Result<(), ApplicationError> {
        let price = item.price.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::MalformedPrice, "Missing price".to_string()))?;
        let price = normalize_price(price)?;
        let details = if self.strip_emoji { strip_emoji(item.details.as_deref()) } else { item.details.clone() };
        self.repository.insert_menu_item(&item.name, price, diner_id, details.as_deref()).await
    }
}

/**
 * Regular files of a batch directory, sorted by path.
 */
async fn list_files(batch_path: &Path) -> Result<Vec<PathBuf>, ApplicationError> {
    let list_error = |err: std::io::Error| ApplicationError::new(ErrorType::Parse, format!("Failed to list batch directory {}: {err}", batch_path.display()));
    let mut entries = tokio::fs::read_dir(batch_path).await.map_err(list_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
        let file_type = entry.file_type().await.map_err(list_error)?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/**
 * Reads and parses one diner file.
 */
async fn read_record(path: &Path) -> Result<DinerRecord, ApplicationError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| ApplicationError::new(ErrorType::Parse, format!("Failed to read file: {err}")))?;
    let text = String::from_utf8(bytes).map_err(|err| ApplicationError::new(ErrorType::Parse, format!("File is not UTF-8: {err}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    serde_json::from_str(text).map_err(|err| ApplicationError::new(ErrorType::Parse, format!("Invalid diner record: {err}")))
}

/**
 * Normalizes the diner part of a record.
 */
fn prepare_diner(record: &DinerRecord) -> Result<DinerInputType, ApplicationError> {
    Ok(DinerInputType {
        name: record.name.clone(),
        address: record.address.clone(),
        city: record.city.clone(),
        district: record.district.clone(),
        price_min: normalize_price(&record.price_min)?,
        price_max: normalize_price(&record.price_max)?,
        website: record.website.clone(),
        review: normalize_review_vector(&record.review_point),
    })
}

fn menu_items(record: &DinerRecord) -> Result<&[MenuItemRecord], ApplicationError> {
    record.menu_items().ok_or_else(|| ApplicationError::new(ErrorType::MissingMenu, "no menu".to_string()))
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::sync::Mutex;

    use chrono::NaiveTime;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::*;
    use crate::model::models::{MenuItemInputType, TimetableInputType};

    /**
     * Repository keeping rows in memory. Ids are assigned like a serial column.
     */
    #[derive(Default)]
    struct MemoryRepository {
        diners: Mutex<Vec<(DinerId, DinerInputType)>>,
        timetable: Mutex<Vec<TimetableInputType>>,
        menu: Mutex<Vec<MenuItemInputType>>,
        reject_diner: Option<String>,
        reject_children_of: Option<DinerId>,
    }

    impl MemoryRepository {
        fn check_child(&self, diner_id: DinerId) -> Result<(), ApplicationError> {
            if self.reject_children_of == Some(diner_id) {
                return Err(ApplicationError::new(ErrorType::Database, "Missing parent diner".to_string()));
            }
            Ok(())
        }
    }

    impl DinerRepository for MemoryRepository {
        async fn insert_diner(&self, diner: &DinerInputType) -> Result<DinerId, ApplicationError> {
            if self.reject_diner.as_deref() == Some(diner.name.as_str()) {
                return Err(ApplicationError::new(ErrorType::Database, "Value too long".to_string()));
            }
            let mut diners = self.diners.lock().unwrap();
            let diner_id = diners.last().map_or(1, |(id, _)| id + 1);
            diners.push((diner_id, diner.clone()));
            Ok(diner_id)
        }

        async fn next_diner_id(&self) -> Result<DinerId, ApplicationError> {
            Ok(self.diners.lock().unwrap().iter().map(|(id, _)| *id).max().map_or(1, |id| id + 1))
        }

        async fn insert_timetable_entry(&self, diner_id: DinerId, start: NaiveTime, end: NaiveTime) -> Result<(), ApplicationError> {
            self.check_child(diner_id)?;
            self.timetable.lock().unwrap().push(TimetableInputType { diner_id, time_start: start, time_close: end });
            Ok(())
        }

        async fn insert_menu_item(&self, name: &str, price: i64, diner_id: DinerId, details: Option<&str>) -> Result<(), ApplicationError> {
            self.check_child(diner_id)?;
            self.menu.lock().unwrap().push(MenuItemInputType { diner_id, name: name.to_string(), price, details: details.map(str::to_string) });
            Ok(())
        }
    }

    fn diner_json(name: &str, time: &str, menu: &str) -> String {
        format!(
            r#"{{
                "name": "{name}",
                "address": "46 Hàng Bông",
                "city": "Hà Nội",
                "district": "Hoàn Kiếm",
                "priceMin": "30.000đ",
                "priceMax": "1,000",
                "website": "https://www.foody.vn/ha-noi/{name}",
                "review_point": [{{"Vị trí": 7.5}}, {{"Chất lượng": "8.1"}}, {{"Wifi": 2}}],
                "Time": {time},
                "menu": {menu}
            }}"#
        )
    }

    fn default_menu() -> &'static str {
        r#"{"data": [{"name": "Phở bò", "price": "50.000đ", "details": "Nước dùng 🍜 đậm"}, {"name": "Quẩy", "price": 5000}]}"#
    }

    fn root(dir: &TempDir, first_batch: u32, last_batch: u32) -> CuisineRoot {
        CuisineRoot {
            name: "phở".to_string(),
            path_prefix: format!("{}/link_store_phở_", dir.path().display()),
            first_batch,
            last_batch,
        }
    }

    fn write_file(root: &CuisineRoot, batch: u32, file_name: &str, contents: &[u8]) -> PathBuf {
        let batch_path = PathBuf::from(root.batch_path(batch));
        fs::create_dir_all(&batch_path).unwrap();
        let path = batch_path.join(file_name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_corrupt_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 2);
        write_file(&root, 1, "a.json", diner_json("pho-a", r#"["06:00-10:00"]"#, default_menu()).as_bytes());
        write_file(&root, 1, "b.json", b"{\"name\": \"pho-b\", \"priceMin\": ");
        write_file(&root, 1, "c.json", diner_json("pho-c", "[]", default_menu()).as_bytes());
        write_file(&root, 2, "d.json", br#"{"priceMin": "1", "priceMax": "2", "review_point": []}"#);
        write_file(&root, 2, "e.json", &[0xff, 0xfe, 0x7b, 0x7d]);
        write_file(&root, 2, "f.json", diner_json("pho-f", "[]", "null").as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        let stats = service.load_in_range(&root).await.unwrap();

        assert_eq!(stats.files, 6);
        assert_eq!(stats.diners, 3);
        assert_eq!(stats.files_skipped, 3);
        let repository = service.into_repository();
        let names: Vec<String> = repository.diners.lock().unwrap().iter().map(|(_, diner)| diner.name.clone()).collect();
        assert_eq!(names, vec!["pho-a", "pho-c", "pho-f"]);
    }

    #[tokio::test]
    async fn test_diner_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        write_file(&root, 1, "a.json", diner_json("pho-a", "[]", default_menu()).as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        service.load_in_range(&root).await.unwrap();

        let repository = service.into_repository();
        let diners = repository.diners.lock().unwrap();
        let (diner_id, diner) = &diners[0];
        assert_eq!(*diner_id, 1);
        assert_eq!(diner.price_min, 30000);
        assert_eq!(diner.price_max, 1000);
        assert_eq!(diner.district.as_deref(), Some("Hoàn Kiếm"));
        assert_eq!(diner.review, [Some(Decimal::new(81, 1)), None, None, Some(Decimal::new(75, 1)), None]);
    }

    #[tokio::test]
    async fn test_empty_menu_is_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        let path = write_file(&root, 1, "a.json", diner_json("pho-a", r#"["06:00-10:00", "16:00-21:30"]"#, r#"{"data": []}"#).as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        let outcome = service.load_file(&path).await.unwrap();

        assert_eq!(
            outcome,
            FileOutcome::Done(FileReport { diner_id: 1, shifts_inserted: 2, shifts_skipped: 0, menu_items_inserted: 0, menu_items_skipped: 0, missing_menu: true })
        );
        let repository = service.into_repository();
        assert_eq!(repository.diners.lock().unwrap().len(), 1);
        assert_eq!(repository.timetable.lock().unwrap().len(), 2);
        assert!(repository.menu.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_shift_only_skips_the_shift() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        let path = write_file(&root, 1, "a.json", diner_json("pho-a", r#"["06:00-10:00", "closed", "10:00-12:00-14:00", "17:00-22:00"]"#, default_menu()).as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        let outcome = service.load_file(&path).await.unwrap();

        let FileOutcome::Done(report) = outcome else { panic!("file should be loaded") };
        assert_eq!(report.shifts_inserted, 2);
        assert_eq!(report.shifts_skipped, 2);
        assert_eq!(report.menu_items_inserted, 2);
        let repository = service.into_repository();
        let timetable = repository.timetable.lock().unwrap();
        assert_eq!(timetable[0].time_start, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(timetable[1].time_close, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_non_text_shift_only_skips_the_shift() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        let path = write_file(&root, 1, "a.json", diner_json("pho-a", r#"["08:00-14:00", null]"#, default_menu()).as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        let outcome = service.load_file(&path).await.unwrap();

        let FileOutcome::Done(report) = outcome else { panic!("file should be loaded") };
        assert_eq!(report.shifts_inserted, 1);
        assert_eq!(report.shifts_skipped, 1);
        assert_eq!(report.menu_items_inserted, 2);
        let repository = service.into_repository();
        assert_eq!(repository.diners.lock().unwrap().len(), 1);
        let timetable = repository.timetable.lock().unwrap();
        assert_eq!(timetable[0].time_start, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_null_time_means_no_shifts() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        let path = write_file(&root, 1, "a.json", diner_json("pho-a", "null", default_menu()).as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        let outcome = service.load_file(&path).await.unwrap();

        assert_eq!(
            outcome,
            FileOutcome::Done(FileReport { diner_id: 1, shifts_inserted: 0, shifts_skipped: 0, menu_items_inserted: 2, menu_items_skipped: 0, missing_menu: false })
        );
    }

    #[tokio::test]
    async fn test_malformed_diner_price_skips_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        let contents = diner_json("pho-a", r#"["06:00-10:00"]"#, default_menu()).replace("30.000đ", "liên hệ");
        let path = write_file(&root, 1, "a.json", contents.as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        let outcome = service.load_file(&path).await.unwrap();

        assert_eq!(outcome, FileOutcome::Skipped);
        let repository = service.into_repository();
        assert!(repository.diners.lock().unwrap().is_empty());
        assert!(repository.timetable.lock().unwrap().is_empty());
        assert!(repository.menu.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_menu_price_skips_item() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        let menu = r#"{"data": [
            {"name": "Phở gà", "price": "giá thời vụ"},
            {"name": "Phở bò", "price": "55.000đ"},
            {"name": "Phở cuốn", "price": null},
            {"name": "Phở trộn"},
            {"name": "Phở xào", "price": false}
        ]}"#;
        let path = write_file(&root, 1, "a.json", diner_json("pho-a", "[]", menu).as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        let outcome = service.load_file(&path).await.unwrap();

        let FileOutcome::Done(report) = outcome else { panic!("file should be loaded") };
        assert_eq!(report.menu_items_inserted, 1);
        assert_eq!(report.menu_items_skipped, 4);
        let repository = service.into_repository();
        assert_eq!(repository.diners.lock().unwrap().len(), 1);
        let menu = repository.menu.lock().unwrap();
        assert_eq!(*menu, vec![MenuItemInputType { diner_id: 1, name: "Phở bò".to_string(), price: 55000, details: None }]);
    }

    #[tokio::test]
    async fn test_children_reference_their_diner() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        write_file(&root, 1, "a.json", diner_json("pho-a", r#"["06:00-10:00"]"#, default_menu()).as_bytes());
        write_file(&root, 1, "b.json", diner_json("pho-b", r#"["07:00-11:00"]"#, r#"{"data": [{"name": "Bún", "price": "40.000đ"}]}"#).as_bytes());
        let service = IngestionService::new(MemoryRepository::default(), false);

        service.load_in_range(&root).await.unwrap();

        let repository = service.into_repository();
        let timetable = repository.timetable.lock().unwrap();
        assert_eq!(timetable.iter().map(|entry| entry.diner_id).collect::<Vec<_>>(), vec![1, 2]);
        let menu = repository.menu.lock().unwrap();
        assert_eq!(menu.iter().map(|item| item.diner_id).collect::<Vec<_>>(), vec![1, 1, 2]);
        assert_eq!(repository.next_diner_id().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_database_error_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        write_file(&root, 1, "a.json", diner_json("pho-a", "[]", default_menu()).as_bytes());
        write_file(&root, 1, "b.json", diner_json("pho-b", "[]", default_menu()).as_bytes());
        write_file(&root, 1, "c.json", diner_json("pho-c", "[]", default_menu()).as_bytes());
        let repository = MemoryRepository { reject_diner: Some("pho-b".to_string()), ..MemoryRepository::default() };
        let service = IngestionService::new(repository, false);

        let result = service.load_in_range(&root).await;

        assert_eq!(result.unwrap_err().error_type, ErrorType::Database);
        let repository = service.into_repository();
        assert_eq!(repository.diners.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timetable_database_error_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        write_file(&root, 1, "a.json", diner_json("pho-a", r#"["06:00-10:00"]"#, default_menu()).as_bytes());
        write_file(&root, 1, "b.json", diner_json("pho-b", r#"["07:00-11:00"]"#, default_menu()).as_bytes());
        write_file(&root, 1, "c.json", diner_json("pho-c", r#"["08:00-12:00"]"#, default_menu()).as_bytes());
        let repository = MemoryRepository { reject_children_of: Some(2), ..MemoryRepository::default() };
        let service = IngestionService::new(repository, false);

        let result = service.load_in_range(&root).await;

        assert_eq!(result.unwrap_err().error_type, ErrorType::Database);
        let repository = service.into_repository();
        assert_eq!(repository.diners.lock().unwrap().len(), 2);
        assert_eq!(repository.timetable.lock().unwrap().iter().map(|entry| entry.diner_id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(repository.menu.lock().unwrap().iter().map(|item| item.diner_id).collect::<Vec<_>>(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_menu_database_error_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        write_file(&root, 1, "a.json", diner_json("pho-a", "[]", default_menu()).as_bytes());
        write_file(&root, 1, "b.json", diner_json("pho-b", "[]", default_menu()).as_bytes());
        let repository = MemoryRepository { reject_children_of: Some(1), ..MemoryRepository::default() };
        let service = IngestionService::new(repository, false);

        let result = service.load_in_range(&root).await;

        assert_eq!(result.unwrap_err().error_type, ErrorType::Database);
        let repository = service.into_repository();
        assert_eq!(repository.diners.lock().unwrap().len(), 1);
        assert!(repository.menu.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_batch_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 3);
        write_file(&root, 1, "a.json", diner_json("pho-a", "[]", default_menu()).as_bytes());
        write_file(&root, 3, "c.json", diner_json("pho-c", "[]", default_menu()).as_bytes());
        fs::create_dir_all(PathBuf::from(root.batch_path(1)).join("nested")).unwrap();
        let service = IngestionService::new(MemoryRepository::default(), false);

        let stats = service.load_in_range(&root).await.unwrap();

        assert_eq!(stats.batches_missing, 1);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.diners, 2);
    }

    #[tokio::test]
    async fn test_emoji_stripped_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir, 1, 1);
        let path = write_file(&root, 1, "a.json", diner_json("pho-a", "[]", default_menu()).as_bytes());

        let service = IngestionService::new(MemoryRepository::default(), false);
        service.load_file(&path).await.unwrap();
        let kept = service.into_repository().menu.lock().unwrap()[0].details.clone();
        assert_eq!(kept.as_deref(), Some("Nước dùng 🍜 đậm"));

        let service = IngestionService::new(MemoryRepository::default(), true);
        service.load_file(&path).await.unwrap();
        let stripped = service.into_repository().menu.lock().unwrap()[0].details.clone();
        assert_eq!(stripped.as_deref(), Some("Nước dùng  đậm"));
    }

    #[tokio::test]
    async fn test_load_corpus_over_roots() {
        let dir = tempfile::tempdir().unwrap();
        let pho = root(&dir, 1, 1);
        let com = CuisineRoot { name: "cơm".to_string(), path_prefix: format!("{}/link_store_cơm_", dir.path().display()), first_batch: 1, last_batch: 1 };
        write_file(&pho, 1, "a.json", diner_json("pho-a", "[]", default_menu()).as_bytes());
        write_file(&com, 1, "a.json", diner_json("com-a", "[]", "{}").as_bytes());
        write_file(&com, 1, "b.json", b"not json");
        let corpus = CorpusConfig { strip_emoji: false, roots: vec![pho, com] };
        let service = IngestionService::new(MemoryRepository::default(), corpus.strip_emoji);

        let stats = service.load_corpus(&corpus).await.unwrap();

        assert_eq!(stats.files, 3);
        assert_eq!(stats.diners, 2);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.diners_without_menu, 1);
        assert_eq!(stats.menu_items_inserted, 2);
    }
}
