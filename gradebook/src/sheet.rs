use crate::error::GradebookError;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use log::info;
use std::path::Path;

const COL_NAME: &str = "Full name";
const COL_GRADE: &str = "Grade";
const COL_COMMENT: &str = "Feedback comments";

/// An in-memory grading worksheet, keyed by integer participant id.
///
/// The identifier column holds values like `Participant 771234`; the
/// numeric tail is the participant id. Grades are stored locale-formatted
/// with a decimal comma, comments as HTML.
#[derive(Debug, Clone)]
pub struct GradingSheet {
    headers: StringRecord,
    rows: Vec<Vec<String>>,
    name_col: usize,
    grade_col: usize,
    comment_col: usize,
}

fn id_of(identifier: &str) -> Option<i64> {
    let digits: String = identifier
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

impl GradingSheet {
    pub fn load(path: &Path) -> Result<Self, GradebookError> {
        let mut reader = ReaderBuilder::new().from_path(path)?;
        let headers = reader.headers()?.clone();

        let col = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| GradebookError::MissingColumn(name.to_string()))
        };
        let name_col = col(COL_NAME)?;
        let grade_col = col(COL_GRADE)?;
        let comment_col = col(COL_COMMENT)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        Ok(Self {
            headers,
            rows,
            name_col,
            grade_col,
            comment_col,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), GradebookError> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        info!("grading sheet saved to '{}'.", path.display());
        Ok(())
    }

    fn row(&self, id: i64) -> Result<&Vec<String>, GradebookError> {
        self.rows
            .iter()
            .find(|r| r.first().and_then(|f| id_of(f)) == Some(id))
            .ok_or(GradebookError::UnknownParticipant(id))
    }

    fn row_mut(&mut self, id: i64) -> Result<&mut Vec<String>, GradebookError> {
        self.rows
            .iter_mut()
            .find(|r| r.first().and_then(|f| id_of(f)) == Some(id))
            .ok_or(GradebookError::UnknownParticipant(id))
    }

    pub fn get_name(&self, id: i64) -> Result<String, GradebookError> {
        let col = self.name_col;
        Ok(self.row(id)?[col].clone())
    }

    /// `None` when the grade cell is still empty (not graded yet).
    pub fn get_points(&self, id: i64) -> Result<Option<f64>, GradebookError> {
        let col = self.grade_col;
        let raw = &self.row(id)?[col];
        if raw.is_empty() {
            return Ok(None);
        }
        raw.replace(',', ".")
            .parse()
            .map(Some)
            .map_err(|_| GradebookError::BadGrade(raw.clone()))
    }

    pub fn set_points(&mut self, id: i64, points: f64) -> Result<(), GradebookError> {
        let col = self.grade_col;
        let formatted = points.to_string().replace('.', ",");
        let row = self.row_mut(id)?;
        row[col] = formatted.clone();
        info!("points for participant {id} set to {formatted}.");
        Ok(())
    }

    /// The raw (HTML-encoded) comment cell.
    pub fn get_comment(&self, id: i64) -> Result<String, GradebookError> {
        let col = self.comment_col;
        Ok(self.row(id)?[col].clone())
    }

    pub fn set_comment(&mut self, id: i64, html: &str) -> Result<(), GradebookError> {
        let col = self.comment_col;
        self.row_mut(id)?[col] = html.to_string();
        info!("comment for participant {id} replaced.");
        Ok(())
    }

    pub fn append_comment(&mut self, id: i64, html: &str) -> Result<(), GradebookError> {
        let col = self.comment_col;
        self.row_mut(id)?[col].push_str(html);
        info!("comment for participant {id} extended.");
        Ok(())
    }

    /// Participants whose full name contains `keyword` (case-insensitive),
    /// as (id, name) pairs in sheet order.
    pub fn find_participants(&self, keyword: &str) -> Vec<(i64, String)> {
        let needle = keyword.to_lowercase();
        self.rows
            .iter()
            .filter(|r| r[self.name_col].to_lowercase().contains(&needle))
            .filter_map(|r| {
                r.first()
                    .and_then(|f| id_of(f))
                    .map(|id| (id, r[self.name_col].clone()))
            })
            .collect()
    }

    /// Keep only the rows for the given participant ids (the re-upload
    /// should contain exactly the rows that changed).
    pub fn retain(&mut self, ids: &[i64]) {
        self.rows
            .retain(|r| r.first().and_then(|f| id_of(f)).is_some_and(|id| ids.contains(&id)));
        info!("grading sheet filtered to {} row/s.", self.rows.len());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
