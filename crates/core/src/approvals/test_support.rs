//! Shared org graph for resolver tests.
//!
//! ```text
//! Academic (1)                               Administrative (2)
//!   College of Computer Studies (10)           University Administration (1)
//!     Dean: Carla e3/u103 (85)                   President: Gina e7/u107 (100, system-wide)
//!     BSCS Program (11)                          Human Resources Office (20)
//!       Faculty: Ana e1/u101 (50)                  HR Officer: Eve e5/u105 (55)
//!       Faculty: Ben e2/u102 (50)                  HR Director: Fred e6/u106 (80)
//!       Program Chair: Hal e8, no user (60)
//!     BSIT Program (12)
//!       Program Chair: Dan e4/u104 (60)
//!   Research Center (30)
//!     Research Director: Ivy e11/u111 (90)
//! ```

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::org::{AuthorityLevel, EmployeeId, PositionId, UnitId};
use crate::org_graph::{InMemoryOrgGraph, NewDesignation};

pub const ANA: EmployeeId = EmployeeId(1);
pub const BEN: EmployeeId = EmployeeId(2);
pub const CARLA: EmployeeId = EmployeeId(3);
pub const DAN: EmployeeId = EmployeeId(4);
pub const EVE: EmployeeId = EmployeeId(5);
pub const GINA: EmployeeId = EmployeeId(7);

pub const LEAVE_REVIEWER_ROLE: i64 = 7;
pub const HR_APPROVER_ROLE: i64 = 8;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
}

pub fn level(value: i64) -> AuthorityLevel {
    AuthorityLevel::new(value).expect("valid level")
}

pub fn designation(id: i64, employee: i64, unit: Option<i64>, position: i64) -> NewDesignation {
    NewDesignation {
        id,
        employee_id: EmployeeId(employee),
        unit_id: unit.map(UnitId),
        position_id: PositionId(position),
        is_primary: true,
        start_date: NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date"),
        end_date: None,
    }
}

pub async fn campus() -> Arc<InMemoryOrgGraph> {
    let graph = InMemoryOrgGraph::default();

    graph.add_unit(1, "University Administration", 2, None).await;
    graph.add_unit(10, "College of Computer Studies", 1, None).await;
    graph.add_unit(11, "BSCS Program", 1, Some(10)).await;
    graph.add_unit(12, "BSIT Program", 1, Some(10)).await;
    graph.add_unit(20, "Human Resources Office", 2, Some(1)).await;
    graph.add_unit(30, "Research Center", 1, None).await;

    graph.add_position(1, "Faculty", Some(1), level(50)).await;
    graph.add_position(2, "Program Chair", Some(1), level(60)).await;
    graph.add_position(3, "Dean", Some(1), level(85)).await;
    graph.add_position(4, "HR Officer", Some(2), level(55)).await;
    graph.add_position(5, "HR Director", Some(2), level(80)).await;
    graph.add_position(6, "University President", None, level(100)).await;
    graph.add_position(7, "Senior Faculty", Some(1), level(65)).await;
    graph.add_position(8, "Research Director", Some(1), level(90)).await;
    graph.add_position(9, "Lab Supervisor", Some(1), level(50)).await;

    for (user, name, employee) in [
        (101, "ana", 1),
        (102, "ben", 2),
        (103, "carla", 3),
        (104, "dan", 4),
        (105, "eve", 5),
        (106, "fred", 6),
        (107, "gina", 7),
        (111, "ivy", 11),
    ] {
        graph.add_user(user, name, Some(employee)).await;
    }

    graph.grant_role(101, LEAVE_REVIEWER_ROLE).await;
    graph.grant_role(102, LEAVE_REVIEWER_ROLE).await;
    graph.grant_role(105, HR_APPROVER_ROLE).await;
    graph.grant_role(106, HR_APPROVER_ROLE).await;

    graph.add_designation(designation(1, 1, Some(11), 1)).await;
    graph.add_designation(designation(2, 2, Some(11), 1)).await;
    graph.add_designation(designation(3, 3, Some(10), 3)).await;
    graph.add_designation(designation(4, 4, Some(12), 2)).await;
    graph.add_designation(designation(5, 5, Some(20), 4)).await;
    graph.add_designation(designation(6, 6, Some(20), 5)).await;
    graph.add_designation(designation(7, 7, Some(1), 6)).await;
    graph.add_designation(designation(8, 8, Some(11), 2)).await;
    graph.add_designation(designation(11, 11, Some(30), 8)).await;

    Arc::new(graph)
}
