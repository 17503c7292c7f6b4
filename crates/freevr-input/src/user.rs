//! Users, their travel through the virtual world, and the conversions
//! between real-world and virtual-world coordinates.
//!
//! `vw2rw` and `rw2vw` are kept as a pair and always updated together, so
//! one is the inverse of the other without ever inverting a matrix.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::context::InputContext;
use crate::generic::GenericInput;
use crate::math::{Axis, Direction, Euler, Matrix, Point3, Vector3};
use crate::types::InputType;
use crate::{InputError, InputResult};

/// Which users a travel operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSelect {
    One(usize),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Travel {
    pub rw2vw: Matrix,
    pub vw2rw: Matrix,
}

impl Default for Travel {
    fn default() -> Self {
        Self {
            rw2vw: Matrix::IDENTITY,
            vw2rw: Matrix::IDENTITY,
        }
    }
}

/// Per-frame snapshot read by renderers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrozenUser {
    pub head: Matrix,
    pub travel: Travel,
}

#[derive(Debug)]
pub struct User {
    name: String,
    head: Arc<GenericInput>,
    travel: RwLock<Travel>,
    frozen: RwLock<FrozenUser>,
}

fn check_scale(scale: f64) -> InputResult<()> {
    if scale == 0.0 || !scale.is_finite() {
        return Err(InputError::InvalidValue(format!("travel scale {scale}")));
    }
    Ok(())
}

impl User {
    pub fn new(name: impl Into<String>, head: Arc<GenericInput>) -> Self {
        Self {
            name: name.into(),
            head,
            travel: RwLock::new(Travel::default()),
            frozen: RwLock::new(FrozenUser::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn head(&self) -> &Arc<GenericInput> {
        &self.head
    }

    pub fn travel(&self) -> Travel {
        *self.travel.read()
    }

    pub fn travel_reset(&self) {
        *self.travel.write() = Travel::default();
    }

    /// Moves the user by `(x, y, z)` in the user's own frame.
    pub fn travel_translate(&self, x: f64, y: f64, z: f64) {
        let mut travel = self.travel.write();
        travel.vw2rw.post_translate(x, y, z);
        travel.rw2vw.pre_translate(-x, -y, -z);
    }

    pub fn travel_rotate(&self, axis: Axis, degrees: f64) {
        let mut travel = self.travel.write();
        travel.rw2vw.pre_rotate(axis, -degrees);
        travel.vw2rw.post_rotate(axis, degrees);
    }

    /// Uniform scale, so the travel pair stays Euclidean.
    pub fn travel_scale(&self, scale: f64) -> InputResult<()> {
        check_scale(scale)?;
        self.scale_unchecked(scale);
        Ok(())
    }

    fn scale_unchecked(&self, scale: f64) {
        let mut travel = self.travel.write();
        travel.vw2rw.post_mult(&Matrix::scale(scale));
        travel.rw2vw.pre_mult(&Matrix::scale(1.0 / scale));
    }

    /// Copies the head pose and travel into the renderer snapshot.
    pub fn freeze(&self) {
        let travel = *self.travel.read();
        let head = self.head.sensor6_matrix_no_last_update();
        *self.frozen.write() = FrozenUser { head, travel };
    }

    pub fn frozen(&self) -> FrozenUser {
        *self.frozen.read()
    }
}

impl InputContext {
    /// Creates the configured users, each using the configured head sensor.
    pub(crate) fn create_users(&self) {
        let count = self.config().num_users;
        let head_index = self.config().head_sensor;
        let mut users = self.users.write();
        users.clear();
        for idx in 0..count {
            let Some(head) = self.map().get_from_type_index(InputType::Sensor6, head_index) else {
                continue;
            };
            users.push(User::new(format!("user{idx}"), head));
        }
        debug!("created {} users", users.len());
    }

    pub fn num_users(&self) -> usize {
        self.users.read().len()
    }

    /// Runs `f` on user `n`, logging and failing when there is no such user.
    pub fn with_user<R>(&self, n: usize, f: impl FnOnce(&User) -> R) -> InputResult<R> {
        let users = self.users.read();
        match users.get(n) {
            Some(user) => Ok(f(user)),
            None => {
                let count = users.len();
                error!("invalid user number {n}, only {count} users");
                Err(InputError::InvalidUser { index: n, count })
            }
        }
    }

    fn for_users(&self, select: UserSelect, f: impl Fn(&User)) -> InputResult<()> {
        match select {
            UserSelect::All => {
                self.users.read().iter().for_each(f);
                Ok(())
            }
            UserSelect::One(n) => self.with_user(n, f),
        }
    }

    pub fn travel_reset(&self, select: UserSelect) -> InputResult<()> {
        self.for_users(select, User::travel_reset)
    }

    pub fn travel_translate(&self, select: UserSelect, x: f64, y: f64, z: f64) -> InputResult<()> {
        self.for_users(select, |user| user.travel_translate(x, y, z))
    }

    pub fn travel_rotate(&self, select: UserSelect, axis: Axis, degrees: f64) -> InputResult<()> {
        self.for_users(select, |user| user.travel_rotate(axis, degrees))
    }

    pub fn travel_scale(&self, select: UserSelect, scale: f64) -> InputResult<()> {
        check_scale(scale)?;
        self.for_users(select, |user| user.scale_unchecked(scale))
    }

    /// `rw2vw` of user `n`, falling back to user 0 for an invalid index.
    pub fn user_travel_matrix(&self, n: usize) -> Matrix {
        self.travel_or_first(n, "user_travel_matrix").rw2vw
    }

    /// `vw2rw` of user `n`, falling back to user 0 for an invalid index.
    pub fn user_travel_matrix_inv(&self, n: usize) -> Matrix {
        self.travel_or_first(n, "user_travel_matrix_inv").vw2rw
    }

    fn travel_or_first(&self, n: usize, op: &str) -> Travel {
        let users = self.users.read();
        let user = match users.get(n) {
            Some(user) => user,
            None => {
                error!(
                    "{op}: invalid user number {n}, range is [0..{}]. Will give User 0 value.",
                    users.len().saturating_sub(1)
                );
                match users.first() {
                    Some(user) => user,
                    None => return Travel::default(),
                }
            }
        };
        user.travel()
    }

    /// `vw2rw * real`; the input matrix itself for an invalid user.
    pub fn vw_from_rw_matrix(&self, n: usize, real: &Matrix) -> Matrix {
        self.with_user(n, |user| {
            let mut out = *real;
            out.pre_mult(&user.travel().vw2rw);
            out
        })
        .unwrap_or(*real)
    }

    pub fn vw_from_rw_point(&self, n: usize, real: &Point3) -> Point3 {
        self.with_user(n, |user| user.travel().vw2rw.transform_point(real))
            .unwrap_or(*real)
    }

    pub fn vw_from_rw_vector(&self, n: usize, real: &Vector3) -> Vector3 {
        self.with_user(n, |user| user.travel().vw2rw.transform_vector(real))
            .unwrap_or(*real)
    }

    pub fn rw_from_vw_point(&self, n: usize, virt: &Point3) -> Point3 {
        self.with_user(n, |user| user.travel().rw2vw.transform_point(virt))
            .unwrap_or(*virt)
    }

    /// Location of a user in the virtual world, given a real-world matrix.
    pub fn vw_point_from_user_matrix(&self, n: usize, mat: &Matrix) -> Point3 {
        let t = mat.translation_part();
        self.vw_from_rw_point(n, &Point3::new(t[0], t[1], t[2]))
    }

    /// Calibrated pose of 6-sensor `n`, read without consuming it.
    pub fn sensor6_matrix_rw(&self, n: usize) -> Matrix {
        self.map()
            .get_from_type_index(InputType::Sensor6, n)
            .map_or(Matrix::IDENTITY, |input| input.sensor6_matrix_no_last_update())
    }

    pub fn point_rw_from_sensor6(&self, n: usize) -> Point3 {
        let t = self.sensor6_matrix_rw(n).translation_part();
        Point3::new(t[0], t[1], t[2])
    }

    pub fn vector_rw_from_sensor6_dir(&self, n: usize, direction: Direction) -> Vector3 {
        self.sensor6_matrix_rw(n).transform_vector(&direction.unit())
    }

    pub fn euler_rw_from_sensor6(&self, n: usize) -> Euler {
        self.sensor6_matrix_rw(n).to_euler()
    }

    pub fn point_vw_from_user_sensor6(&self, user: usize, n: usize) -> Point3 {
        self.vw_from_rw_point(user, &self.point_rw_from_sensor6(n))
    }

    pub fn vector_vw_from_user_sensor6_dir(&self, user: usize, n: usize, direction: Direction) -> Vector3 {
        self.vw_from_rw_vector(user, &self.vector_rw_from_sensor6_dir(n, direction))
    }

    pub fn euler_vw_from_user_sensor6(&self, user: usize, n: usize) -> Euler {
        self.vw_from_rw_matrix(user, &self.sensor6_matrix_rw(n)).to_euler()
    }

    /// Copies every user's head pose and travel into their frozen copies.
    pub fn freeze_users(&self) {
        for user in self.users.read().iter() {
            user.freeze();
        }
    }
}
