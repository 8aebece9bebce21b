// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Database row mapping for domain models.

use rusqlite::{
    Result, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};

use crate::model::{Song, SourceKind};

impl Song {
    /// Maps an SQLite row to a [`Song`] instance.
    ///
    /// Expects the columns in the order of `SONG_COLUMNS`.
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            album: row.get(3)?,
            duration_seconds: row.get(4)?,
            source: row.get(5)?,
            youtube_url: row.get(6)?,
            file_url: row.get(7)?,
            play_count: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl ToSql for SourceKind {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SourceKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "upload" => Ok(SourceKind::Upload),
            "youtube" => Ok(SourceKind::Youtube),
            "sample" => Ok(SourceKind::Sample),
            other => Err(FromSqlError::Other(
                format!("unknown song source: {}", other).into(),
            )),
        }
    }
}
