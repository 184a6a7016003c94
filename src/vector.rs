use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// A 3D vector represented by its x, y, and z components.
///
/// # Example
///
/// ```
/// use chirality::vector::Vector;
///
/// let v1 = Vector::new(1.0, 2.0, 3.0);
/// let v2 = Vector::new(4.0, 5.0, 6.0);
/// let v3 = v1 + v2;
/// let v4 = v1 * 2.0;
/// assert_eq!(v3, Vector::new(5.0, 7.0, 9.0));
/// assert_eq!(v4, Vector::new(2.0, 4.0, 6.0));
/// ```
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Add<Vector> for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, scalar: f64) -> Vector {
        Vector {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Div<f64> for Vector {
    type Output = Vector;

    fn div(self, scalar: f64) -> Self::Output {
        Vector {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl Sub<Vector> for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Self::Output {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl Default for Vector {
    /// Creates a default `Vector` being the zero vector
    ///
    /// # Examples
    ///
    /// ```
    /// use chirality::vector::Vector;
    ///
    /// let v = Vector::default();
    /// assert_eq!(v.length(), 0.0)
    /// ```
    fn default() -> Vector {
        Vector::new(0.0, 0.0, 0.0)
    }
}

impl Vector {
    /// Creates a `Vector` from x, y, and z components.
    ///
    /// # Examples
    ///
    /// ```
    /// use chirality::vector::Vector;
    ///
    /// let v = Vector::new(1.0, 2.0, 3.0);
    /// println!("Vector: {:?}", v);
    /// ```
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
    pub fn x() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
    pub fn y() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }
    pub fn z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
    /// Calculates the length of a vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use chirality::vector::Vector;
    ///
    /// let v = Vector::new(1.0, 1.0, 1.0);
    /// assert_eq!(v.length(), 3.0_f64.sqrt())
    /// ```
    pub fn length(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }
    /// Calculates the dot product of two vectors.
    ///
    /// # Examples
    ///
    /// ```
    /// use chirality::vector::Vector;
    ///
    /// let v1 = Vector::new(1.0, 2.0, 3.0);
    /// let v2 = Vector::new(4.0, 5.0, 6.0);
    /// assert_eq!(v1.dot(&v2), 32.0);
    /// ```
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
    /// Calculates the cross product of two vectors and returns a new vector
    ///
    /// # Examples
    ///
    /// ```
    /// use chirality::vector::Vector;
    ///
    /// let vec1 = Vector::x();
    /// let vec2 = Vector::y();
    /// assert_eq!(vec1.cross(&vec2), Vector::z())
    /// ```
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }
    /// Calculates a normal vector for a given input vector
    ///
    /// # Example
    ///
    /// ```
    /// use chirality::vector::Vector;
    ///
    /// let vec1 = Vector::new(1.0, 2.0, 3.0);
    /// assert_eq!(vec1.normalize().length().ceil(), 1.0)
    /// ```
    pub fn normalize(&self) -> Self {
        if self.length() == 0.0 {
            *self
        } else {
            *self / self.length()
        }
    }
    /// Returns the (unnormalized) normal of the plane through three points,
    /// oriented by the right-hand rule walking `a` -> `b` -> `c`.
    ///
    /// # Example
    ///
    /// ```
    /// use chirality::vector::Vector;
    ///
    /// let n = Vector::normal_through_points(
    ///     &Vector::default(),
    ///     &Vector::x(),
    ///     &Vector::y(),
    /// );
    /// assert_eq!(n.normalize(), Vector::z());
    /// ```
    pub fn normal_through_points(a: &Vector, b: &Vector, c: &Vector) -> Vector {
        (*b - *a).cross(&(*c - *a))
    }
    /// Signed distance of this point from the plane through `origin` with
    /// the given (not necessarily unit-length) `normal`. Returns 0.0 for a
    /// degenerate normal.
    ///
    /// # Example
    ///
    /// ```
    /// use chirality::vector::Vector;
    ///
    /// let p = Vector::new(0.0, 0.0, 2.0);
    /// let d = p.distance_to_plane(&Vector::default(), &Vector::z());
    /// assert_eq!(d, 2.0);
    /// ```
    pub fn distance_to_plane(&self, origin: &Vector, normal: &Vector) -> f64 {
        let length = normal.length();
        if length == 0.0 {
            0.0
        } else {
            (*self - *origin).dot(normal) / length
        }
    }
    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}
