use crate::checks::Findings;
use crate::engine::AutoAssignReport;
use crate::load::FacultyLoad;
use crate::model::{AcademicYear, FacultyMember, Project};
use crate::stats;

pub fn display_loads(faculty: &[FacultyMember], loads: &[FacultyLoad]) {
    for (f, l) in faculty.iter().zip(loads) {
        print!("  - {f}: {}", l.load);
        if !l.eligible {
            print!(" (full)");
        }
        println!();
    }
    let histogram = stats::load_histogram(loads);
    if !histogram.is_empty() {
        println!("Load distribution:");
        for (load, n) in histogram.iter().enumerate() {
            if *n != 0 {
                println!("  - {load} project(s): {n} faculty member(s)");
            }
        }
    }
}

pub fn display_report(report: &AutoAssignReport, faculty: &[FacultyMember]) {
    for f in faculty {
        let projects = report.plan.projects_for(f.id);
        if !projects.is_empty() {
            println!("{f}:");
            for p in projects {
                println!("  - project {p}");
            }
        }
    }
    println!(
        "Assigned/unassigned: {}/{}{}",
        report.assigned_count,
        report.plan.unassigned_count(),
        if report.committed { "" } else { " (not committed)" }
    );
}

pub fn display_project(project: &Project) {
    print!("{} [{}]: {}", project.id, project.status, project.title);
    match project.guide {
        Some(guide) => println!(" (guide {guide})"),
        None => println!(" (no guide)"),
    }
}

pub fn display_year(year: &AcademicYear) {
    println!(
        "{} {}{}",
        year.id,
        year,
        if year.is_current { " (current)" } else { "" }
    );
}

pub fn display_findings(findings: &Findings) {
    if findings.is_clean() {
        println!("No inconsistency found");
        return;
    }
    for (member, load) in &findings.over_capacity {
        println!("  - faculty member {member} guides {load} projects");
    }
    for project in &findings.guideless_not_proposed {
        println!("  - project {project} has no guide but is not proposed anymore");
    }
    if findings.current_years.len() > 1 {
        println!(
            "  - {} academic years are current",
            findings.current_years.len()
        );
    }
}
