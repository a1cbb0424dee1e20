use crate::grid::{ScheduleGrid, UnreflectedRequestRecord};
use crate::model::{Eligibility, Member, MemberId, Request, RequestId, ShiftKind};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::path::Path;

/// Import de membres depuis CSV: header `id,name,eligible[,skill][,role][,intensity]`
///
/// `eligible` liste des codes de postes (`DEN`, `D|E|M`…) ; vide = tous.
pub fn import_members_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Member>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = rec.get(0).context("missing id")?.trim();
        let name = rec.get(1).context("missing name")?.trim();
        if id.is_empty() || name.is_empty() {
            bail!("invalid member row (empty)");
        }
        let mut member = Member::new(id, name);
        if let Some(raw) = rec.get(2).map(str::trim).filter(|s| !s.is_empty()) {
            member.eligibility = Eligibility::parse_codes(raw)
                .with_context(|| format!("invalid eligibility for member {id}"))?;
        }
        member.skill = optional(rec.get(3));
        member.role = optional(rec.get(4));
        if let Some(raw) = optional(rec.get(5)) {
            member.work_intensity = Some(
                raw.parse()
                    .with_context(|| format!("invalid intensity for member {id}"))?,
            );
        }
        out.push(member);
    }
    Ok(out)
}

fn optional(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Import de demandes: header `id,member,date,shift[,memo]` (date `YYYY-MM-DD`)
///
/// Un id vide est remplacé par un identifiant aléatoire. Statut initial : Hold.
pub fn import_requests_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Request>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = rec.get(0).context("missing id")?.trim();
        let member = rec.get(1).context("missing member")?.trim();
        let date = rec.get(2).context("missing date")?.trim();
        let shift = rec.get(3).context("missing shift")?.trim();
        if member.is_empty() {
            bail!("invalid request row (empty member)");
        }
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid date: {date}"))?;
        let shift: ShiftKind = shift.parse()?;
        let mut request = Request::new(MemberId::new(member), date, shift);
        if !id.is_empty() {
            request = request.with_id(RequestId::new(id));
        }
        if let Some(memo) = optional(rec.get(4)) {
            request = request.with_memo(memo);
        }
        out.push(request);
    }
    Ok(out)
}

/// Export CSV d'un planning: header `member,1,2,…` puis un code de poste par jour.
pub fn write_grid_csv<W: std::io::Write>(writer: W, grid: &ScheduleGrid) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(writer);
    let mut buf = itoa::Buffer::new();
    let mut header = vec!["member".to_string()];
    header.extend((1..=grid.days()).map(|d| buf.format(d).to_string()));
    w.write_record(&header)?;
    for row in &grid.rows {
        let mut record = vec![row.member.as_str().to_string()];
        record.extend(row.shifts.iter().map(|k| k.code().to_string()));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

pub fn export_grid_csv<P: AsRef<Path>>(path: P, grid: &ScheduleGrid) -> anyhow::Result<()> {
    let file = File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_grid_csv(file, grid)
}

/// Export CSV des demandes non satisfaites.
pub fn export_unreflected_csv<P: AsRef<Path>>(
    path: P,
    records: &[UnreflectedRequestRecord],
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "request_id",
        "member_id",
        "member_name",
        "date",
        "requested",
        "actual",
        "memo",
    ])?;
    for r in records {
        let date = r.date.format("%Y-%m-%d").to_string();
        let requested = r.requested.to_string();
        let actual = r.actual.to_string();
        w.write_record([
            r.request_id.as_str(),
            r.member_id.as_str(),
            r.member_name.as_str(),
            date.as_str(),
            requested.as_str(),
            actual.as_str(),
            r.memo.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
