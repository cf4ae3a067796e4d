//! Headerless CSV stores, one flat table per record type.
//!
//! | file            | columns                         |
//! |-----------------|---------------------------------|
//! | positions       | driver_id, "(lat, lon)"         |
//! | signal posts    | latitude, longitude             |
//! | emergencies     | priority, driver_id             |
//! | alerts          | "(lat, lon)", high              |

use super::{lock, AlertLog, ChangeNotifier, EmergencyRegistry, Loaded, PositionStore, SignalPostSource};
use crate::errors::{RecordError, StoreError};
use crate::shared_data::{
    Alert, AlertEntry, Coordinates, EmergencyDeclaration, Position, Priority, Severity, SignalPost,
};
use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tokio::sync::watch;

// Reads every row of `path` undecoded. `None` when the file does not exist.
fn read_raw_rows(path: &Path) -> Result<Option<Vec<(u64, ByteRecord)>>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (index, result) in rdr.byte_records().enumerate() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(index as u64 + 1);
        rows.push((line, record));
    }
    Ok(Some(rows))
}

// Reads and decodes every row of `path`. `None` when the file does not exist.
fn read_rows(path: &Path) -> Result<Option<Vec<(u64, Result<StringRecord, RecordError>)>>, StoreError> {
    let Some(raw) = read_raw_rows(path)? else {
        return Ok(None);
    };
    let rows = raw
        .into_iter()
        .map(|(line, record)| {
            let decoded = StringRecord::from_byte_record(record)
                .map_err(|e| RecordError::Unreadable(e.utf8_error().to_string()));
            (line, decoded)
        })
        .collect();
    Ok(Some(rows))
}

// Parses rows into records, collecting rejections instead of failing.
fn load_with<T>(
    path: &Path,
    parse: impl Fn(&StringRecord) -> Result<T, RecordError>,
) -> Result<Loaded<T>, StoreError> {
    let Some(rows) = read_rows(path)? else {
        return Ok(Loaded::missing());
    };
    let mut loaded = Loaded::new(Vec::with_capacity(rows.len()));
    for (line, row) in rows {
        match row.and_then(|record| parse(&record)) {
            Ok(record) => loaded.records.push(record),
            Err(e) => loaded.rejected.push((line, e)),
        }
    }
    Ok(loaded)
}

fn expect_columns(record: &StringRecord, expected: usize) -> Result<(), RecordError> {
    if record.len() != expected {
        return Err(RecordError::ColumnCount {
            expected,
            found: record.len(),
        });
    }
    Ok(())
}

// Appends one row; the file is created on first write.
fn append_row(path: &Path, row: &[&str]) -> Result<(), StoreError> {
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(row)?;
    wtr.flush()?;
    Ok(())
}

// Writes all rows to a temp file beside `path`, then renames it over `path`.
fn replace_rows(path: &Path, rows: &[ByteRecord]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(tmp.as_file_mut());
        for row in rows {
            wtr.write_byte_record(row)?;
        }
        wtr.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn parse_position(record: &StringRecord) -> Result<Position, RecordError> {
    expect_columns(record, 2)?;
    let coordinates = Coordinates::parse_literal(&record[1])?;
    Position::new(&record[0], coordinates.latitude, coordinates.longitude)
}

fn parse_signal_post(record: &StringRecord) -> Result<SignalPost, RecordError> {
    expect_columns(record, 2)?;
    let malformed = || RecordError::MalformedCoordinates(format!("{},{}", &record[0], &record[1]));
    let lat = record[0].parse::<f64>().map_err(|_| malformed())?;
    let lon = record[1].parse::<f64>().map_err(|_| malformed())?;
    SignalPost::new(lat, lon)
}

fn parse_declaration(record: &StringRecord) -> Result<EmergencyDeclaration, RecordError> {
    expect_columns(record, 2)?;
    let priority = record[0].parse::<Priority>()?;
    EmergencyDeclaration::new(priority, &record[1])
}

fn parse_alert(record: &StringRecord) -> Result<AlertEntry, RecordError> {
    expect_columns(record, 2)?;
    Ok(AlertEntry {
        signal_post: SignalPost {
            coordinates: Coordinates::parse_literal(&record[0])?,
        },
        severity: record[1].parse::<Severity>()?,
    })
}

#[derive(Debug)]
pub struct CsvPositionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    notifier: ChangeNotifier,
}

impl CsvPositionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PositionStore for CsvPositionStore {
    fn upsert(&self, position: Position) -> Result<(), StoreError> {
        {
            let _guard = lock(&self.write_lock);
            // Rows from other writers are carried over byte for byte, even
            // when they do not decode or parse.
            let mut rows: Vec<ByteRecord> = read_raw_rows(&self.path)?
                .unwrap_or_default()
                .into_iter()
                .map(|(_, row)| row)
                .collect();
            let literal = position.coordinates.to_literal();
            let updated = ByteRecord::from(vec![position.driver_id.as_str(), literal.as_str()]);

            match rows.iter_mut().find(|row| {
                row.get(0).and_then(|id| std::str::from_utf8(id).ok())
                    == Some(position.driver_id.as_str())
            }) {
                Some(row) => *row = updated,
                None => rows.push(updated),
            }
            replace_rows(&self.path, &rows)?;
        }
        debug!(
            "Updated position for {}: {}",
            position.driver_id, position.coordinates
        );
        self.notifier.bump();
        Ok(())
    }

    fn load(&self) -> Result<Loaded<Position>, StoreError> {
        load_with(&self.path, parse_position)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }

    fn notify_changed(&self) {
        self.notifier.bump();
    }
}

#[derive(Debug, Clone)]
pub struct CsvSignalPosts {
    path: PathBuf,
}

impl CsvSignalPosts {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SignalPostSource for CsvSignalPosts {
    fn load(&self) -> Result<Loaded<SignalPost>, StoreError> {
        load_with(&self.path, parse_signal_post)
    }
}

#[derive(Debug)]
pub struct CsvEmergencyRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvEmergencyRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl EmergencyRegistry for CsvEmergencyRegistry {
    fn append(&self, declaration: EmergencyDeclaration) -> Result<(), StoreError> {
        let _guard = lock(&self.write_lock);
        append_row(
            &self.path,
            &[declaration.priority.as_str(), declaration.driver_id.as_str()],
        )
    }

    fn load(&self) -> Result<Loaded<EmergencyDeclaration>, StoreError> {
        load_with(&self.path, parse_declaration)
    }
}

#[derive(Debug)]
pub struct CsvAlertLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvAlertLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl AlertLog for CsvAlertLog {
    fn append(&self, alert: &Alert) -> Result<(), StoreError> {
        let _guard = lock(&self.write_lock);
        let literal = alert.signal_post.coordinates.to_literal();
        append_row(&self.path, &[literal.as_str(), alert.severity.as_str()])
    }

    fn entries(&self) -> Result<Vec<AlertEntry>, StoreError> {
        let loaded = load_with(&self.path, parse_alert)?;
        loaded.report("alert log");
        Ok(loaded.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_files_load_as_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = CsvPositionStore::new(dir.path().join("coordinates.csv"))
            .load()
            .unwrap();
        assert!(loaded.missing);
        assert!(loaded.records.is_empty());

        let posts = CsvSignalPosts::new(dir.path().join("signal_coor.csv"))
            .load()
            .unwrap();
        assert!(posts.missing);
    }

    #[test]
    fn position_upsert_replaces_row_and_keeps_foreign_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinates.csv");
        fs::write(&path, "D1,\"(1.0, 1.0)\"\nD9,Location not available\n").unwrap();

        let store = CsvPositionStore::new(&path);
        store.upsert(Position::new("D1", 12.5, 77.25).unwrap()).unwrap();
        store.upsert(Position::new("D2", 13.0, 77.0).unwrap()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "D1,\"(12.5, 77.25)\"\nD9,Location not available\nD2,\"(13.0, 77.0)\"\n"
        );

        let loaded = store.load().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].0, 2);
        assert!(matches!(
            loaded.rejected[0].1,
            RecordError::MalformedCoordinates(_)
        ));
    }

    #[test]
    fn position_upsert_keeps_rows_that_are_not_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinates.csv");
        fs::write(&path, b"D9,\"(1.0, 1.0)\xff\"\nD1,\"(2.0, 2.0)\"\n").unwrap();

        let store = CsvPositionStore::new(&path);
        store.upsert(Position::new("D2", 3.0, 3.0).unwrap()).unwrap();
        store.upsert(Position::new("D1", 4.0, 4.0).unwrap()).unwrap();

        assert_eq!(
            fs::read(&path).unwrap(),
            b"D9,\"(1.0, 1.0)\xff\"\nD1,\"(4.0, 4.0)\"\nD2,\"(3.0, 3.0)\"\n".to_vec()
        );

        let loaded = store.load().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].0, 1);
        assert!(matches!(loaded.rejected[0].1, RecordError::Unreadable(_)));
    }

    #[test]
    fn signal_posts_skip_bad_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signal_coor.csv");
        fs::write(&path, "12.97, 77.59\nnorth,east\n13.0,77.6,extra\n").unwrap();

        let loaded = CsvSignalPosts::new(&path).load().unwrap();
        assert_eq!(loaded.records, vec![SignalPost::new(12.97, 77.59).unwrap()]);
        assert_eq!(loaded.rejected.len(), 2);
        assert_eq!(
            loaded.rejected[1].1,
            RecordError::ColumnCount {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn emergency_registry_appends_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("emergency.csv");
        let registry = CsvEmergencyRegistry::new(&path);

        registry
            .append(EmergencyDeclaration::new(Priority::Low, "D1").unwrap())
            .unwrap();
        assert!(!registry.has_active_emergency().unwrap());
        registry
            .append(EmergencyDeclaration::new(Priority::High, "D1").unwrap())
            .unwrap();
        assert!(registry.has_active_emergency().unwrap());

        assert_eq!(fs::read_to_string(&path).unwrap(), "Low,D1\nHigh,D1\n");
    }

    #[test]
    fn unknown_priority_rows_are_not_active() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("emergency.csv");
        fs::write(&path, "Select Priority,D1\nLow,D2\n").unwrap();

        let registry = CsvEmergencyRegistry::new(&path);
        let loaded = registry.load().unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.rejected.len(), 1);
        assert!(!registry.has_active_emergency().unwrap());
    }

    #[test]
    fn alert_log_accumulates_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        let log = CsvAlertLog::new(&path);
        let alert = Alert {
            driver_id: "D1".to_string(),
            signal_post: SignalPost::new(12.97, 77.59).unwrap(),
            severity: Severity::High,
            created_at: 0,
        };

        log.append(&alert).unwrap();
        log.append(&alert).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "\"(12.97, 77.59)\",high\n\"(12.97, 77.59)\",high\n"
        );
        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], AlertEntry::from(&alert));
    }
}
